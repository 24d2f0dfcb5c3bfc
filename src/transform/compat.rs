//! Email-compatibility fixes
//!
//! A fixed sequence of independent, idempotent passes correcting the things
//! mail clients are known to mishandle: insecure URLs, missing background
//! fallbacks, unsized images, legacy MSO spacing, lost alignment and
//! unreadable footer links.

use crate::css::StyleMap;
use crate::dom::{Document, ElementData, Node, query};
use log::debug;

/// Substrings identifying social-platform URLs
const SOCIAL_HOSTS: &[&str] = &[
    "facebook.",
    "instagram.",
    "twitter.",
    "x.com",
    "linkedin.",
    "youtube.",
    "tiktok.",
    "pinterest.",
];

/// Email-safe default width for full-bleed images
const DEFAULT_IMAGE_WIDTH: u32 = 600;

/// Default width for social icons
const SOCIAL_ICON_WIDTH: u32 = 42;

/// Images at least this wide get `display: block` treatment
const LARGE_IMAGE_WIDTH: u32 = 300;

/// Run all compatibility passes in their fixed order
pub fn apply(document: &mut Document) {
    upgrade_urls(&mut document.root);
    bgcolor_fallback(&mut document.root);
    normalize_images(&mut document.root);
    strip_mso_table_spacing(&mut document.root);
    preserve_alignment(&mut document.root);
    footer_link_contrast(&mut document.root);
}

/// Rewrite `http://` image sources and link targets to `https://`
fn upgrade_urls(root: &mut Node) {
    let mut upgraded = 0usize;
    root.for_each_element_mut(&mut |el| {
        let attr = match el.tag.as_str() {
            "img" => "src",
            "a" => "href",
            _ => return,
        };
        let secure = el
            .attr(attr)
            .and_then(|value| value.strip_prefix("http://"))
            .map(|rest| format!("https://{rest}"));
        if let Some(url) = secure {
            el.set_attr(attr, url);
            upgraded += 1;
        }
    });
    if upgraded > 0 {
        debug!("upgraded {upgraded} http:// reference(s) to https://");
    }
}

/// Mirror inline `background-color: rgb(...)` onto a `bgcolor` hex attribute
/// for content cells, which some Outlook builds need as a fallback
fn bgcolor_fallback(root: &mut Node) {
    query::walk_elements(root, &mut |node, ancestors| {
        if !node.is_tag("td") && !node.is_tag("th") {
            return;
        }
        let has_text = node.has_text();
        let Some(el) = node.as_element_mut() else {
            return;
        };
        let map = StyleMap::from_element(el);
        let Some(hex) = map.get("background-color").and_then(rgb_to_hex) else {
            return;
        };
        // Structural full-bleed cells are skipped to avoid double-painting
        let has_padding = map.contains("padding")
            || map.contains("padding-top")
            || map.contains("padding-right")
            || map.contains("padding-bottom")
            || map.contains("padding-left");
        let structural = inside_full_width_table(ancestors);
        if has_padding || has_text || !structural {
            el.set_attr_if_absent("bgcolor", &hex);
        }
    });
}

/// Ensure every image carries `border="0"`, a numeric `width` attribute and
/// (for large standalone images) block display
fn normalize_images(root: &mut Node) {
    query::walk_elements(root, &mut |node, ancestors| {
        if !node.is_tag("img") {
            return;
        }
        let Some(el) = node.as_element_mut() else {
            return;
        };
        el.set_attr("border", "0");

        let mut map = StyleMap::from_element(el);
        let social = is_social_image(el, ancestors);
        let width = match el.attr("width").and_then(|w| w.parse::<u32>().ok()) {
            Some(w) => w,
            None => {
                let derived = derive_width(&map, social);
                el.set_attr("width", derived.to_string());
                derived
            }
        };

        let centered = inside_centered_container(ancestors);
        if width >= LARGE_IMAGE_WIDTH && !social && !is_logo(el) && !centered {
            map.set("display", "block");
            map.remove("vertical-align");
            map.apply_to(el);
        }
    });
}

/// Width derivation chain: explicit pixel width, then max-width, then the
/// 600px email-safe default for 100%-width images, then the social-icon
/// default, then 600px. Mail clients without a width attribute render
/// images at native size.
fn derive_width(map: &StyleMap, social: bool) -> u32 {
    if let Some(w) = map.get("width").and_then(parse_px) {
        return w;
    }
    if let Some(w) = map.get("max-width").and_then(parse_px) {
        return w;
    }
    if map.get("width").map(str::trim) == Some("100%") {
        return DEFAULT_IMAGE_WIDTH;
    }
    if social {
        return SOCIAL_ICON_WIDTH;
    }
    DEFAULT_IMAGE_WIDTH
}

/// Remove legacy `mso-table-lspace`/`mso-table-rspace` declarations;
/// superseded by `border-collapse` and flagged by CSS validators
fn strip_mso_table_spacing(root: &mut Node) {
    root.for_each_element_mut(&mut |el| {
        if el.attr("style").is_none() {
            return;
        }
        let mut map = StyleMap::from_element(el);
        let removed =
            map.remove("mso-table-lspace") | map.remove("mso-table-rspace");
        if removed {
            map.apply_to(el);
        }
    });
}

/// Keep author alignment intact across clients that drop attributes or
/// inline styles but not both
fn preserve_alignment(root: &mut Node) {
    query::walk_elements(root, &mut |node, ancestors| {
        let is_cell = node.is_tag("td") || node.is_tag("th");
        let is_img = node.is_tag("img");
        let is_a = node.is_tag("a");
        if !is_cell && !is_img && !is_a {
            return;
        }

        if is_cell {
            let multi_social = count_social_links(node) >= 2;
            let Some(el) = node.as_element_mut() else {
                return;
            };
            let mut map = StyleMap::from_element(el);
            if el.attr("align") == Some("center") {
                map.set_if_absent("text-align", "center");
            }
            // Footer cells listing several social links stay left-aligned
            if multi_social {
                map.set("text-align", "left");
            }
            map.apply_to(el);
            return;
        }

        let Some(el) = node.as_element_mut() else {
            return;
        };
        let social = if is_img {
            is_social_image(el, ancestors)
        } else {
            el.attr("href").is_some_and(is_social_url)
        };

        let mut map = StyleMap::from_element(el);
        if social {
            // Social icons and their links render side by side
            map.set("display", "inline-block");
            map.apply_to(el);
            return;
        }
        if is_img && is_logo(el) {
            map.set("margin-left", "auto");
            map.set("margin-right", "auto");
            map.set_if_absent("display", "block");
            map.apply_to(el);
        }
    });
}

/// Inside black-background tables, force text links to white underline
fn footer_link_contrast(root: &mut Node) {
    query::walk_elements(root, &mut |node, _| {
        if !node.is_tag("table") {
            return;
        }
        let black = node.as_element().is_some_and(has_black_background);
        if black {
            whiten_links(node);
        }
    });
}

fn whiten_links(node: &mut Node) {
    if node.is_tag("a") {
        // Links that only wrap an image are left alone
        if node.has_text() {
            let Some(el) = node.as_element_mut() else {
                return;
            };
            let mut map = StyleMap::from_element(el);
            map.set("color", "#ffffff");
            map.set("text-decoration", "underline");
            map.apply_to(el);
        }
        return;
    }
    for child in &mut node.children {
        whiten_links(child);
    }
}

// --- helpers ---

fn is_social_url(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    SOCIAL_HOSTS.iter().any(|host| url.contains(host))
}

/// An image counts as social when its own source or an enclosing link
/// points at a social platform
fn is_social_image(el: &ElementData, ancestors: &[ElementData]) -> bool {
    if el.attr("src").is_some_and(is_social_url) {
        return true;
    }
    ancestors
        .iter()
        .any(|a| a.tag == "a" && a.attr("href").is_some_and(is_social_url))
}

fn is_logo(el: &ElementData) -> bool {
    ["src", "alt", "class"].iter().any(|name| {
        el.attr(name)
            .is_some_and(|v| v.to_ascii_lowercase().contains("logo"))
    })
}

fn inside_full_width_table(ancestors: &[ElementData]) -> bool {
    ancestors.iter().rev().find(|a| a.tag == "table").is_some_and(|table| {
        table.attr("width").map(str::trim) == Some("100%")
            || StyleMap::from_element(table).get("width").map(str::trim) == Some("100%")
    })
}

fn inside_centered_container(ancestors: &[ElementData]) -> bool {
    ancestors.iter().any(|a| {
        a.tag == "center"
            || a.attr("align") == Some("center")
            || StyleMap::from_element(a).get("text-align").map(str::trim) == Some("center")
    })
}

fn count_social_links(node: &Node) -> usize {
    let own = usize::from(
        node.as_element()
            .filter(|el| el.tag == "a")
            .and_then(|el| el.attr("href"))
            .is_some_and(is_social_url),
    );
    own + node.children.iter().map(count_social_links).sum::<usize>()
}

/// `background-color: rgb(r, g, b)` → `#rrggbb`
fn rgb_to_hex(value: &str) -> Option<String> {
    let inner = value
        .trim()
        .strip_prefix("rgb(")?
        .strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u8>());
    let r = parts.next()?.ok()?;
    let g = parts.next()?.ok()?;
    let b = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(format!("#{r:02x}{g:02x}{b:02x}"))
}

fn parse_px(value: &str) -> Option<u32> {
    let number = value.trim().strip_suffix("px")?.trim();
    number.parse::<f32>().ok().map(|f| f.round() as u32)
}

fn has_black_background(el: &ElementData) -> bool {
    let style_black = {
        let map = StyleMap::from_element(el);
        ["background-color", "background"]
            .iter()
            .any(|p| map.get(p).is_some_and(is_black))
    };
    style_black || el.attr("bgcolor").is_some_and(is_black)
}

fn is_black(value: &str) -> bool {
    let v: String = value
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    matches!(v.as_str(), "#000" | "#000000" | "black" | "rgb(0,0,0)")
}
