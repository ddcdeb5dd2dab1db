//! XML bodies for PROPFIND, PROPPATCH and SEARCH.
//!
//! Properties in the `DAV:` namespace are written with the `D:` prefix that
//! is bound on the root element. Properties in any other namespace are
//! written unprefixed, with their own `xmlns="..."` declaration:
//!
//! ```text
//! <D:propfind xmlns:D="DAV:"><D:prop><D:getetag/><color xmlns="urn:x"/></D:prop></D:propfind>
//! ```
//!
//! Output goes through the `xml-rs` event writer, so text values are
//! escaped and every element is closed exactly once. Names cannot be
//! escaped, so they are checked instead, and so are characters XML cannot
//! carry at all (control characters in values and namespaces).
use bytes::Bytes;
use xml::EmitterConfig;
use xml::writer::{EventWriter, XmlEvent as XmlWEvent};

use crate::errors::{DavError, DavResult};

pub const NS_DAV_URI: &str = "DAV:";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;
const SEARCH_XML_DECL: &str = r#"<?xml version="1.0"?>"#;

/// Properties to ask for in a PROPFIND: namespace -> property names.
///
/// Keeps insertion order, so the generated XML is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyQuery {
    entries: Vec<(String, Vec<String>)>,
}

impl PropertyQuery {
    pub fn new() -> PropertyQuery {
        PropertyQuery::default()
    }

    /// Add a property. Adding the same one twice is a no-op.
    pub fn add(&mut self, namespace: impl Into<String>, name: impl Into<String>) -> &mut Self {
        let (namespace, name) = (namespace.into(), name.into());
        let names = entry(&mut self.entries, namespace);
        if !names.contains(&name) {
            names.push(name);
        }
        self
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        self.add(namespace, name);
        self
    }

    /// Add several properties from the `DAV:` namespace.
    pub fn dav<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        for name in names {
            self.add(NS_DAV_URI, name);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, names)| names.is_empty())
    }

    /// Iterate over `(namespace, name)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(ns, names)| names.iter().map(move |n| (ns.as_str(), n.as_str())))
    }
}

/// Property changes for a PROPPATCH: values to set and names to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyUpdate {
    set:    Vec<(String, Vec<(String, String)>)>,
    remove: Vec<(String, Vec<String>)>,
}

impl PropertyUpdate {
    pub fn new() -> PropertyUpdate {
        PropertyUpdate::default()
    }

    /// Set a property. Setting it again replaces the value.
    pub fn set(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self
    {
        let (namespace, name, value) = (namespace.into(), name.into(), value.into());
        let props = entry(&mut self.set, namespace);
        match props.iter_mut().find(|(n, _)| *n == name) {
            Some(prop) => prop.1 = value,
            None => props.push((name, value)),
        }
        self
    }

    /// Remove a property from the resource.
    pub fn remove(&mut self, namespace: impl Into<String>, name: impl Into<String>) -> &mut Self {
        let (namespace, name) = (namespace.into(), name.into());
        let names = entry(&mut self.remove, namespace);
        if !names.contains(&name) {
            names.push(name);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.iter().all(|(_, p)| p.is_empty()) && self.remove.iter().all(|(_, p)| p.is_empty())
    }
}

fn entry<T>(entries: &mut Vec<(String, Vec<T>)>, namespace: String) -> &mut Vec<T> {
    let idx = match entries.iter().position(|(ns, _)| *ns == namespace) {
        Some(idx) => idx,
        None => {
            entries.push((namespace, Vec::new()));
            entries.len() - 1
        },
    };
    &mut entries[idx].1
}

// an XML NCName, ASCII subset plus anything non-ASCII.
fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = match chars.next() {
        Some(c) => c == '_' || c.is_alphabetic(),
        None => false,
    };
    first_ok && chars.all(|c| c == '_' || c == '-' || c == '.' || c.is_alphanumeric())
}

// the XML 1.0 `Char` production. Surrogates cannot occur in a `char`.
fn xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn check_property(namespace: &str, name: &str) -> DavResult<()> {
    if !valid_name(name) {
        return Err(DavError::MalformedXmlInput(format!("invalid property name {:?}", name)));
    }
    // the writer does not escape namespace declarations.
    if namespace.is_empty() || namespace.contains(['"', '<', '>', '&']) || !namespace.chars().all(xml_char) {
        return Err(DavError::MalformedXmlInput(format!("invalid namespace {:?}", namespace)));
    }
    Ok(())
}

// the writer escapes markup but passes control characters through.
fn check_value(name: &str, value: &str) -> DavResult<()> {
    if !value.chars().all(xml_char) {
        return Err(DavError::MalformedXmlInput(format!("invalid character in value of {:?}", name)));
    }
    Ok(())
}

type Emitter = EventWriter<Vec<u8>>;

fn emitter(decl: &str) -> Emitter {
    let config = EmitterConfig::new()
        .perform_indent(false)
        .write_document_declaration(false)
        .pad_self_closing(false);
    EventWriter::new_with_config(decl.as_bytes().to_vec(), config)
}

fn start_prop(emitter: &mut Emitter, namespace: &str, name: &str) -> DavResult<()> {
    check_property(namespace, name)?;
    if namespace == NS_DAV_URI {
        emitter.write(XmlWEvent::start_element(format!("D:{}", name).as_str()))?;
    } else {
        emitter.write(XmlWEvent::start_element(name).default_ns(namespace))?;
    }
    Ok(())
}

fn empty_prop(emitter: &mut Emitter, namespace: &str, name: &str) -> DavResult<()> {
    start_prop(emitter, namespace, name)?;
    emitter.write(XmlWEvent::end_element())?;
    Ok(())
}

/// PROPFIND body asking for the properties in `query`.
pub fn encode_propfind(query: &PropertyQuery) -> DavResult<Bytes> {
    let mut emitter = emitter(XML_DECL);
    emitter.write(XmlWEvent::start_element("D:propfind").ns("D", NS_DAV_URI))?;
    emitter.write(XmlWEvent::start_element("D:prop"))?;
    for (ns, name) in query.iter() {
        empty_prop(&mut emitter, ns, name)?;
    }
    emitter.write(XmlWEvent::end_element())?; // prop
    emitter.write(XmlWEvent::end_element())?; // propfind
    Ok(Bytes::from(emitter.into_inner()))
}

/// PROPPATCH body with a `set` block and, if needed, a `remove` block.
pub fn encode_proppatch(update: &PropertyUpdate) -> DavResult<Bytes> {
    let mut emitter = emitter(XML_DECL);
    emitter.write(XmlWEvent::start_element("D:propertyupdate").ns("D", NS_DAV_URI))?;

    if update.set.iter().any(|(_, p)| !p.is_empty()) {
        emitter.write(XmlWEvent::start_element("D:set"))?;
        emitter.write(XmlWEvent::start_element("D:prop"))?;
        for (ns, props) in &update.set {
            for (name, value) in props {
                check_value(name, value)?;
                start_prop(&mut emitter, ns, name)?;
                if !value.is_empty() {
                    emitter.write(XmlWEvent::characters(value))?;
                }
                emitter.write(XmlWEvent::end_element())?;
            }
        }
        emitter.write(XmlWEvent::end_element())?; // prop
        emitter.write(XmlWEvent::end_element())?; // set
    }

    if update.remove.iter().any(|(_, p)| !p.is_empty()) {
        emitter.write(XmlWEvent::start_element("D:remove"))?;
        emitter.write(XmlWEvent::start_element("D:prop"))?;
        for (ns, names) in &update.remove {
            for name in names {
                empty_prop(&mut emitter, ns, name)?;
            }
        }
        emitter.write(XmlWEvent::end_element())?; // prop
        emitter.write(XmlWEvent::end_element())?; // remove
    }

    emitter.write(XmlWEvent::end_element())?; // propertyupdate
    Ok(Bytes::from(emitter.into_inner()))
}

/// SEARCH body. `query` is a search grammar fragment, e.g. a
/// `<D:basicsearch>` element, inserted as-is.
pub fn encode_search(query: &str) -> Bytes {
    let xml = format!(
        "{}\r\n{}\r\n{}{}\r\n",
        SEARCH_XML_DECL, r#"<D:searchrequest xmlns:D="DAV:">"#, query, "</D:searchrequest>"
    );
    Bytes::from(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmltree::{Element, XMLNode};

    fn as_str(b: &Bytes) -> &str {
        std::str::from_utf8(b).unwrap()
    }

    fn children(e: &Element) -> Vec<&Element> {
        e.children.iter().filter_map(XMLNode::as_element).collect()
    }

    #[test]
    fn propfind_dav_properties() {
        let query = PropertyQuery::new().dav(["getlastmodified", "getcontentlength", "resourcetype"]);
        let body = encode_propfind(&query).unwrap();
        assert_eq!(
            as_str(&body),
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                r#"<D:propfind xmlns:D="DAV:"><D:prop>"#,
                "<D:getlastmodified/><D:getcontentlength/><D:resourcetype/>",
                "</D:prop></D:propfind>"
            )
        );
    }

    #[test]
    fn propfind_foreign_namespace() {
        let query = PropertyQuery::new()
            .with(NS_DAV_URI, "getetag")
            .with("http://owncloud.org/ns", "size")
            .with("http://owncloud.org/ns", "permissions");
        let body = encode_propfind(&query).unwrap();
        let text = as_str(&body);
        assert!(text.contains(r#"<size xmlns="http://owncloud.org/ns"/>"#), "{}", text);
        assert!(text.contains(r#"<permissions xmlns="http://owncloud.org/ns"/>"#), "{}", text);

        let root = Element::parse(&body[..]).unwrap();
        assert_eq!(root.name, "propfind");
        assert_eq!(root.namespace.as_deref(), Some("DAV:"));
        let prop = root.get_child("prop").unwrap();
        let props = children(prop);
        assert_eq!(props.len(), 3);
        assert_eq!(props[0].name, "getetag");
        assert_eq!(props[0].namespace.as_deref(), Some("DAV:"));
        assert_eq!(props[1].name, "size");
        assert_eq!(props[1].namespace.as_deref(), Some("http://owncloud.org/ns"));
    }

    #[test]
    fn propfind_keeps_order_and_drops_duplicates() {
        let mut query = PropertyQuery::new();
        query.add("urn:b", "z").add(NS_DAV_URI, "a").add("urn:b", "y").add("urn:b", "z");
        let order: Vec<_> = query.iter().collect();
        assert_eq!(order, vec![("urn:b", "z"), ("urn:b", "y"), ("DAV:", "a")]);
    }

    #[test]
    fn proppatch_is_well_formed_and_escaped() {
        let mut update = PropertyUpdate::new();
        update
            .set(NS_DAV_URI, "displayname", "Q&A <draft>")
            .set("urn:example", "author", "O\"Brien")
            .set("urn:example", "author", "Jane")
            .remove("urn:example", "obsolete");
        let body = encode_proppatch(&update).unwrap();
        let text = as_str(&body);
        assert!(text.starts_with(r#"<?xml version="1.0" encoding="utf-8"?><D:propertyupdate xmlns:D="DAV:">"#));
        assert!(text.contains("<D:displayname>Q&amp;A &lt;draft"), "{}", text);
        assert!(text.contains(r#"<author xmlns="urn:example">Jane</author>"#), "{}", text);
        assert!(!text.contains("O\"Brien"));

        let root = Element::parse(&body[..]).unwrap();
        assert_eq!(root.name, "propertyupdate");
        let set = root.get_child("set").unwrap().get_child("prop").unwrap();
        let props = children(set);
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].get_text().as_deref(), Some("Q&A <draft>"));
        assert_eq!(props[1].get_text().as_deref(), Some("Jane"));
        let removed = children(root.get_child("remove").unwrap().get_child("prop").unwrap());
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].name, "obsolete");
        assert!(removed[0].children.is_empty());
    }

    #[test]
    fn proppatch_without_removals_has_no_remove_block() {
        let mut update = PropertyUpdate::new();
        update.set(NS_DAV_URI, "displayname", "x");
        let text = String::from_utf8(encode_proppatch(&update).unwrap().to_vec()).unwrap();
        assert!(!text.contains("D:remove"));
        assert!(text.ends_with("</D:prop></D:set></D:propertyupdate>"));
    }

    #[test]
    fn invalid_names_are_rejected() {
        for name in ["", "1abc", "a b", "a>b", "a:b", "<x/>"] {
            let query = PropertyQuery::new().with(NS_DAV_URI, name);
            assert!(matches!(encode_propfind(&query), Err(DavError::MalformedXmlInput(_))), "{:?}", name);
        }
        let query = PropertyQuery::new().with("urn:\"x", "a");
        assert!(matches!(encode_propfind(&query), Err(DavError::MalformedXmlInput(_))));
    }

    #[test]
    fn control_characters_are_rejected() {
        for value in ["a\u{1}b", "\u{0}", "x\u{1b}[0m", "\u{FFFE}", "\u{FFFF}"] {
            let mut update = PropertyUpdate::new();
            update.set(NS_DAV_URI, "displayname", value);
            assert!(matches!(encode_proppatch(&update), Err(DavError::MalformedXmlInput(_))), "{:?}", value);
        }
        let query = PropertyQuery::new().with("urn:a\u{7}b", "size");
        assert!(matches!(encode_propfind(&query), Err(DavError::MalformedXmlInput(_))));

        // tabs, newlines and non-ASCII text are fine.
        let mut update = PropertyUpdate::new();
        update.set(NS_DAV_URI, "displayname", "line\tone\r\nzwei \u{1F600}");
        let body = encode_proppatch(&update).unwrap();
        let root = Element::parse(&body[..]).unwrap();
        let prop = root.get_child("set").unwrap().get_child("prop").unwrap();
        assert!(children(prop)[0].get_text().unwrap().contains("zwei \u{1F600}"));
    }

    #[test]
    fn search_envelope() {
        let body = encode_search("<D:basicsearch/>");
        assert_eq!(
            as_str(&body),
            "<?xml version=\"1.0\"?>\r\n<D:searchrequest xmlns:D=\"DAV:\">\r\n<D:basicsearch/></D:searchrequest>\r\n"
        );
    }
}
