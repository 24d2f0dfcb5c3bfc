//! Identifier anonymization
//!
//! The upstream editor marks machine-assigned ids with a literal `i` prefix
//! followed by alphanumerics. Those are replaced with opaque tokens and all
//! internal `href="#id"` / `for="id"` references are rewritten. The `id-`
//! replacement prefix contains a hyphen, so rewritten ids can never re-match
//! the detection pattern and a second run leaves them alone.

use crate::dom::{Document, Node, NodeData};
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Whether an id looks machine-assigned (`^i[a-zA-Z0-9]+$`)
pub fn is_generated_id(id: &str) -> bool {
    let mut chars = id.chars();
    chars.next() == Some('i') && id.len() > 1 && chars.all(|c| c.is_ascii_alphanumeric())
}

/// Replace auto-generated ids with opaque tokens and rewrite references;
/// returns the number of ids rewritten
pub fn rewrite_ids<R: Rng>(document: &mut Document, rng: &mut R) -> usize {
    let mut map: HashMap<String, String> = HashMap::new();
    let mut minted: HashSet<String> = HashSet::new();

    rename(&mut document.root, rng, &mut map, &mut minted);
    if map.is_empty() {
        return 0;
    }
    rewrite_references(&mut document.root, &map);
    map.len()
}

fn rename<R: Rng>(
    node: &mut Node,
    rng: &mut R,
    map: &mut HashMap<String, String>,
    minted: &mut HashSet<String>,
) {
    if let NodeData::Element(el) = &mut node.data {
        if let Some(old) = el.id().map(String::from) {
            if is_generated_id(&old) {
                let fresh = loop {
                    let candidate = opaque_token(rng);
                    if minted.insert(candidate.clone()) {
                        break candidate;
                    }
                };
                el.set_attr("id", fresh.clone());
                map.insert(old, fresh);
            }
        }
    }
    for child in &mut node.children {
        rename(child, rng, map, minted);
    }
}

fn rewrite_references(node: &mut Node, map: &HashMap<String, String>) {
    if let NodeData::Element(el) = &mut node.data {
        for attr in &mut el.attrs {
            match attr.name.as_str() {
                "href" => {
                    if let Some(target) = attr.value.strip_prefix('#') {
                        if let Some(fresh) = map.get(target) {
                            attr.value = format!("#{fresh}");
                        }
                    }
                }
                "for" => {
                    if let Some(fresh) = map.get(&attr.value) {
                        attr.value = fresh.clone();
                    }
                }
                _ => {}
            }
        }
    }
    for child in &mut node.children {
        rewrite_references(child, map);
    }
}

/// `id-` + 32 random hex digits shaped like a version-4 UUID
fn opaque_token<R: Rng>(rng: &mut R) -> String {
    const HEX: [char; 16] = [
        '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
    ];
    let mut hex: Vec<char> = (0..32).map(|_| HEX[rng.gen_range(0..16)]).collect();
    hex[12] = '4';
    hex[16] = HEX[rng.gen_range(8..12)];
    let s: String = hex.into_iter().collect();
    format!(
        "id-{}-{}-{}-{}-{}",
        &s[0..8],
        &s[8..12],
        &s[12..16],
        &s[16..20],
        &s[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlParser;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn attr_of(doc: &mut Document, tag: &str, name: &str) -> Option<String> {
        doc.root
            .find_tag_mut(tag)?
            .as_element()
            .unwrap()
            .attr(name)
            .map(String::from)
    }

    #[test]
    fn test_generated_pattern() {
        assert!(is_generated_id("i4f2"));
        assert!(is_generated_id("iABC123"));
        assert!(!is_generated_id("i"));
        assert!(!is_generated_id("intro-section"));
        assert!(!is_generated_id("main"));
        assert!(!is_generated_id("id-1234"));
    }

    #[test]
    fn test_token_shape_is_deterministic_with_seeded_rng() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = opaque_token(&mut rng);
        let mut rng = StdRng::seed_from_u64(7);
        let b = opaque_token(&mut rng);
        assert_eq!(a, b);
        assert!(a.starts_with("id-"));
        let sections: Vec<&str> = a["id-".len()..].split('-').collect();
        let lens: Vec<usize> = sections.iter().map(|s| s.len()).collect();
        assert_eq!(lens, vec![8, 4, 4, 4, 12]);
        assert!(sections[2].starts_with('4'));
        assert!(matches!(
            sections[3].chars().next(),
            Some('8' | '9' | 'a' | 'b')
        ));
    }

    #[test]
    fn test_references_rewritten() {
        let mut doc = HtmlParser::new()
            .parse(
                r##"<body><h2 id="i9x1">Title</h2>
                   <a href="#i9x1">jump</a>
                   <label for="i9x1">lbl</label>
                   <a href="#authored">other</a></body>"##,
            )
            .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(rewrite_ids(&mut doc, &mut rng), 1);

        let new_id = attr_of(&mut doc, "h2", "id").unwrap();
        assert!(new_id.starts_with("id-"));
        assert_eq!(attr_of(&mut doc, "a", "href").unwrap(), format!("#{new_id}"));
        assert_eq!(attr_of(&mut doc, "label", "for").unwrap(), new_id);
    }

    #[test]
    fn test_authored_ids_untouched() {
        let mut doc = HtmlParser::new()
            .parse(
                r##"<body><div id="intro-section">x</div><a href="#intro-section">y</a></body>"##,
            )
            .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(rewrite_ids(&mut doc, &mut rng), 0);
        assert_eq!(attr_of(&mut doc, "div", "id").unwrap(), "intro-section");
        assert_eq!(attr_of(&mut doc, "a", "href").unwrap(), "#intro-section");
    }

    #[test]
    fn test_second_run_is_noop() {
        let mut doc = HtmlParser::new()
            .parse(r#"<body><div id="iAb12">x</div></body>"#)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        rewrite_ids(&mut doc, &mut rng);
        let first = attr_of(&mut doc, "div", "id").unwrap();
        rewrite_ids(&mut doc, &mut rng);
        assert_eq!(attr_of(&mut doc, "div", "id").unwrap(), first);
    }

    #[test]
    fn test_tokens_unique() {
        let mut doc = HtmlParser::new()
            .parse(
                r#"<body><div id="i1">a</div><div id="i2">b</div><div id="i3">c</div></body>"#,
            )
            .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(rewrite_ids(&mut doc, &mut rng), 3);
        let mut ids = Vec::new();
        doc.root.for_each_element_mut(&mut |el| {
            if let Some(id) = el.id() {
                ids.push(id.to_string());
            }
        });
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
