use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hard cap on elements returned to the caller. Pages with thousands of
/// candidates would otherwise blow up inspection payloads.
pub const MAX_ELEMENTS: usize = 150;

/// In-page scan for interactive elements. Evaluated as an expression; returns
/// an array of element records in visual order (top-to-bottom, rows merged
/// when tops are within 30px).
///
/// Visibility rules: zero-size, off-viewport and display:none/hidden/opacity:0
/// elements are dropped, as are elements covered at their center point, except
/// small clickables (icons, compact buttons) which stay even when covered.
pub const ELEMENT_SCAN_JS: &str = r#"
(() => {
  function exactPosition(element) {
    try {
      const clientRects = element.getClientRects();
      if (clientRects.length > 0) {
        const r = clientRects[0];
        return { left: r.left, top: r.top, width: r.width, height: r.height };
      }
      return element.getBoundingClientRect();
    } catch (e) {
      return element.getBoundingClientRect();
    }
  }

  function describe(element, index) {
    try {
      const exact = exactPosition(element);
      const rect = element.getBoundingClientRect();
      if (rect.width <= 0 || rect.height <= 0) return null;
      if (rect.right < 0 || rect.bottom < 0 ||
          rect.left > window.innerWidth || rect.top > window.innerHeight) return null;

      const style = window.getComputedStyle(element);
      if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') {
        return null;
      }

      const centerX = rect.left + rect.width / 2;
      const centerY = rect.top + rect.height / 2;
      const atPoint = document.elementFromPoint(centerX, centerY);
      const uncovered = element === atPoint || element.contains(atPoint) ||
        (atPoint && atPoint.contains(element));

      const smallClickable = (rect.width < 40 || rect.height < 40) && (
        element.tagName === 'A' ||
        element.tagName === 'BUTTON' ||
        element.onclick ||
        element.getAttribute('role') === 'button' ||
        element.classList.contains('btn') ||
        element.classList.contains('button') ||
        element.classList.contains('icon') ||
        /icon/i.test(element.className) ||
        /btn/i.test(element.className)
      );

      if (!uncovered && !smallClickable) return null;

      function cssSelector(el) {
        if (!el) return '';
        if (el.id) return '#' + el.id;
        if (el.getAttribute('data-testid')) {
          return '[data-testid="' + el.getAttribute('data-testid') + '"]';
        }
        if (el.getAttribute('data-id')) {
          return '[data-id="' + el.getAttribute('data-id') + '"]';
        }
        if (el.tagName === 'A' || el.tagName === 'BUTTON') {
          const componentClasses = Array.from(el.classList).filter(cls =>
            /btn|button|link|icon|nav|menu|tab|card|item/i.test(cls)
          );
          if (componentClasses.length > 0) {
            return el.tagName.toLowerCase() + '.' + componentClasses.join('.');
          }
        }
        if (rect.width < 40 && rect.height < 40 &&
            (el.querySelector('svg') || el.querySelector('img'))) {
          const parent = el.parentElement;
          if (parent) {
            return cssSelector(parent) + ' > ' + el.tagName.toLowerCase();
          }
        }
        const tag = el.tagName.toLowerCase();
        const parent = el.parentElement;
        if (parent) {
          const childIndex = Array.from(parent.children).indexOf(el) + 1;
          return tag + ':nth-child(' + childIndex + ')';
        }
        return tag;
      }

      let text = element.innerText || element.textContent || '';
      text = text.trim().replace(/\s+/g, ' ').substring(0, 100);

      const clickable = (
        element.tagName === 'A' ||
        element.tagName === 'BUTTON' ||
        element.tagName === 'INPUT' ||
        element.tagName === 'SELECT' ||
        element.tagName === 'TEXTAREA' ||
        element.onclick != null ||
        style.cursor === 'pointer' ||
        element.getAttribute('role') === 'button' ||
        element.hasAttribute('clickable') ||
        element.classList.contains('btn') ||
        element.classList.contains('button') ||
        smallClickable
      );

      const attributes = {};
      for (const attr of element.attributes) {
        if (['id', 'class', 'name', 'href', 'src', 'alt', 'title', 'role',
             'type', 'value', 'placeholder', 'aria-label'].includes(attr.name)) {
          attributes[attr.name] = attr.value;
        }
      }

      return {
        id: index,
        tagName: element.tagName.toLowerCase(),
        text: text,
        selector: cssSelector(element),
        rect: {
          x: Math.round(exact.left),
          y: Math.round(exact.top),
          width: Math.round(exact.width),
          height: Math.round(exact.height)
        },
        clickable: clickable,
        isSmallClickable: smallClickable,
        attributes: attributes,
        zIndex: parseInt(style.zIndex) || 0
      };
    } catch (e) {
      return null;
    }
  }

  try {
    const interactiveSelectors = [
      'a', 'button', 'input[type="button"]', 'input[type="submit"]',
      'svg', 'svg *', '.icon', '.icons', '*[class*="icon"]',
      '[onclick]', '[role="button"]', '[role="link"]',
      '[class*="btn"]', '[class*="button"]',
      '[class*="link"]', '[class*="icon"]',
      '[tabindex]:not([tabindex="-1"])',
      '[data-testid]', '[data-id]',
      'img[alt]', 'img[title]',
      '.social-icon', '.share-icon', '.download-icon', '.menu-icon',
      'nav a', '.navigation a', '.menu a'
    ];

    let candidates = [];
    for (const selector of interactiveSelectors) {
      try {
        candidates = candidates.concat(Array.from(document.querySelectorAll(selector)));
      } catch (e) {
        // Invalid selector on exotic pages; skip it.
      }
    }
    candidates = Array.from(new Set(candidates));

    candidates.sort((a, b) => {
      const rectA = a.getBoundingClientRect();
      const rectB = b.getBoundingClientRect();
      if (Math.abs(rectA.top - rectB.top) < 30) {
        return rectA.left - rectB.left;
      }
      return rectA.top - rectB.top;
    });

    const elements = [];
    candidates.forEach((element, index) => {
      const info = describe(element, index);
      if (info) elements.push(info);
    });
    return elements;
  } catch (e) {
    return [];
  }
})()
"#;

/// Viewport rectangle of a scanned element, rounded to whole pixels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// One interactive element reported by the in-page scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageElement {
    pub id: usize,
    pub tag_name: String,
    #[serde(default)]
    pub text: String,
    pub selector: String,
    pub rect: ElementRect,
    #[serde(default)]
    pub clickable: bool,
    #[serde(default)]
    pub is_small_clickable: bool,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub z_index: i64,
}

/// Stable-sort the scan output so small clickables come first, then buttons
/// and links, cap at [`MAX_ELEMENTS`] and renumber. The stable sort preserves
/// visual order inside each priority band.
pub fn prioritize_elements(mut elements: Vec<PageElement>) -> Vec<PageElement> {
    elements.sort_by_key(|el| {
        if el.is_small_clickable {
            0
        } else if el.tag_name == "a" || el.tag_name == "button" {
            1
        } else {
            2
        }
    });
    elements.truncate(MAX_ELEMENTS);
    for (index, element) in elements.iter_mut().enumerate() {
        element.id = index;
    }
    elements
}
