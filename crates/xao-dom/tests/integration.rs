//! Integration tests for xao-dom
//!
//! Construction modes, helpers, queries, custom tags and serialization.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use xao_dom::{DocMode, DomDoc, DomError, Xot, XAO_NAMESPACE};

const SIMPLE_XML: &str = r#"<catalog><item id="1">First</item><item id="2">Second</item><item id="3">Third</item></catalog>"#;

fn xml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ============== Construction ==============

#[test]
fn from_data_parses_document() {
    let doc = DomDoc::from_data(SIMPLE_XML);
    assert_eq!(doc.mode(), DocMode::Data);
    assert_eq!(doc.local_name(doc.root()), Some("catalog"));
    assert!(!doc.has_exceptions());
}

#[test]
fn from_file_remembers_path() {
    let file = xml_file(SIMPLE_XML);
    let doc = DomDoc::from_file(file.path());
    assert_eq!(doc.mode(), DocMode::ReadFile);
    assert_eq!(doc.source_path(), Some(file.path()));
    assert_eq!(doc.elements_by_tag_name("item").len(), 3);
}

#[test]
fn from_target_picks_file_or_data() {
    let file = xml_file("<fromfile/>");
    let target = file.path().to_str().unwrap();
    assert_eq!(DomDoc::from_target(target).mode(), DocMode::ReadFile);
    assert_eq!(DomDoc::from_target("<data/>").mode(), DocMode::Data);
}

#[test]
fn from_reference_adopts_tree() {
    let mut xot = Xot::new();
    let document = xot.parse("<adopted><child/></adopted>").unwrap();
    let doc = DomDoc::from_reference(xot, document);
    assert_eq!(doc.mode(), DocMode::Reference);
    assert_eq!(doc.xml_frag().unwrap(), "<adopted><child/></adopted>");
}

#[test]
fn from_reference_without_root_aborts() {
    let mut xot = Xot::new();
    let document = xot.new_document();
    let doc = DomDoc::from_reference(xot, document);
    assert_eq!(doc.local_name(doc.root()), Some("root"));
    assert_eq!(doc.exceptions()[0].code(), Some("DomDocInit"));
}

#[test]
fn from_reference_to_element_aborts() {
    let mut xot = Xot::new();
    let document = xot.parse("<outer><inner/></outer>").unwrap();
    let outer = xot.document_element(document).unwrap();
    let doc = DomDoc::from_reference(xot, outer);
    assert_eq!(doc.mode(), DocMode::Reference);
    assert_eq!(doc.local_name(doc.root()), Some("root"));
    assert_eq!(doc.exceptions()[0].code(), Some("DomDocInit"));
}

#[test]
fn malformed_data_yields_error_element() {
    let doc = DomDoc::from_data("<a>\n<b>\n</c>\n</a>");
    assert_eq!(doc.local_name(doc.root()), Some("root"));

    let messages = doc.xpath_nodes("/root/xao:exceptions/xao:exception/xao:msg").unwrap();
    assert_eq!(messages.len(), 1, "one exception should be recorded");
    let text = doc.text_content(messages[0]);
    assert!(text.contains("on or near line 3"), "unexpected message: {text}");

    let exception = doc.exceptions()[0].clone();
    assert_eq!(exception.code(), Some("DomDocInit"));
    assert_eq!(exception.location.map(|l| l.file), Some(file!()));
}

#[test]
fn missing_file_yields_error_element() {
    let dir = tempfile::tempdir().unwrap();
    let doc = DomDoc::from_file(dir.path().join("absent.xml"));
    assert!(doc.exceptions()[0].message.contains("not found"));
    assert!(doc.exceptions_node().is_some());
}

// ============== Helpers ==============

#[test]
fn append_helpers_build_content() {
    let mut doc = DomDoc::new("page");
    let section = doc.append_to_root("section", "").unwrap();
    doc.append_to_node(section, "para", "a < b").unwrap();
    assert_eq!(
        doc.xml_frag().unwrap(),
        "<page><section><para>a &lt; b</para></section></page>"
    );
}

#[test]
fn append_rejects_bad_names_and_stubs() {
    let mut doc = DomDoc::new("page");
    assert!(matches!(
        doc.append_to_root("bad name", ""),
        Err(DomError::InvalidName(_))
    ));
    assert!(matches!(
        doc.append_to_root("nope:el", ""),
        Err(DomError::UnboundPrefix(_))
    ));
    let text_stub = {
        let el = doc.append_to_root("t", "text").unwrap();
        doc.xot().first_child(el).unwrap()
    };
    assert!(matches!(
        doc.append_to_node(text_stub, "x", ""),
        Err(DomError::NotAnElement(_))
    ));
}

#[test]
fn xao_prefix_binds_automatically() {
    let mut doc = DomDoc::new("page");
    let el = doc.append_to_root("xao:note", "hi").unwrap();
    assert_eq!(doc.namespace_uri(el), Some(XAO_NAMESPACE));
}

#[test]
fn get_one_el_indexes_document_order() {
    let doc = DomDoc::from_data(SIMPLE_XML);
    let second = doc.get_one_el("item", 1).unwrap();
    assert_eq!(doc.attribute(second, "id").as_deref(), Some("2"));
    assert!(doc.get_one_el("item", 3).is_none());
    assert_eq!(doc.elements_by_tag_name("*").len(), 4);
}

#[test]
fn unprefixed_lookup_matches_namespaced_elements() {
    let doc = DomDoc::from_data(r#"<a xmlns="urn:d" xmlns:p="urn:p"><item/><p:item/></a>"#);
    assert_eq!(doc.elements_by_tag_name("item").len(), 2);
    assert_eq!(doc.elements_by_tag_name("p:item").len(), 1);
}

#[test]
fn attribute_helpers() {
    let mut doc = DomDoc::new("page");
    let root = doc.root();
    doc.set_attributes(root, &[("lang", "en"), ("xmlns:x", "urn:x"), ("x:flag", "on")])
        .unwrap();
    assert_eq!(doc.attribute(root, "lang").as_deref(), Some("en"));
    assert_eq!(doc.attribute(root, "x:flag").as_deref(), Some("on"));
    assert_eq!(doc.attribute_ns(root, "urn:x", "flag").as_deref(), Some("on"));
    assert_eq!(doc.attribute_ns(root, "urn:y", "flag"), None);
    assert!(doc.remove_attribute(root, "lang").unwrap());
    assert!(!doc.remove_attribute(root, "lang").unwrap());
    assert_eq!(
        doc.xml_frag().unwrap(),
        r#"<page xmlns:x="urn:x" x:flag="on"/>"#
    );
}

#[test]
fn xml_prefixed_attributes() {
    let doc = DomDoc::from_data(r#"<p xml:lang="en"/>"#);
    assert_eq!(doc.attribute(doc.root(), "xml:lang").as_deref(), Some("en"));

    let mut doc = DomDoc::new("page");
    let root = doc.root();
    doc.set_attributes(root, &[("xml:space", "preserve")]).unwrap();
    assert_eq!(doc.attribute(root, "xml:space").as_deref(), Some("preserve"));
    assert_eq!(doc.xml_frag().unwrap(), r#"<page xml:space="preserve"/>"#);
}

#[test]
fn set_content_replaces_children() {
    let mut doc = DomDoc::from_data("<a><b/>old</a>");
    let root = doc.root();
    doc.set_content(root, "new").unwrap();
    assert_eq!(doc.xml_frag().unwrap(), "<a>new</a>");
    assert_eq!(doc.text_content(root), "new");
}

#[test]
fn name_checks() {
    assert!(DomDoc::is_valid_name("xao:exceptions"));
    assert!(!DomDoc::is_valid_name("<tag>"));
    assert!(DomDoc::is_safe_name("page_id"));
    assert!(!DomDoc::is_safe_name("9lives"));
}

// ============== Errors ==============

#[test]
fn throw_builds_exception_tree() {
    let mut doc = DomDoc::new("page");
    doc.throw("  first  ", &[("code", "E1"), ("empty", "")]);
    doc.throw("", &[]);

    let container = doc.exceptions_node().unwrap();
    assert_eq!(doc.parent(container), Some(doc.root()));
    assert_eq!(doc.namespace_uri(container), Some(XAO_NAMESPACE));
    assert_eq!(doc.element_children(container).len(), 2, "container is a singleton");

    let first = doc.element_children(container)[0];
    assert_eq!(doc.attribute(first, "code").as_deref(), Some("E1"));
    assert_eq!(doc.attribute(first, "empty"), None);

    let messages: Vec<String> = doc.exceptions().iter().map(|e| e.message.clone()).collect();
    assert_eq!(messages, ["first", "The error message was empty."]);

    let call = doc.xpath_nodes("//xao:exception[position() = 1]/xao:stack/xao:call").unwrap();
    assert_eq!(doc.attribute(call[0], "file").as_deref(), Some(file!()));
}

#[test]
fn throw_after_container_was_removed() {
    let mut doc = DomDoc::new("page");
    doc.set_create_stack_trace(false);
    doc.throw("first", &[]);
    let root = doc.root();
    doc.set_content(root, "reset").unwrap();
    assert_eq!(doc.exceptions_node(), None);

    let second = doc.throw("second", &[]).unwrap();
    let container = doc.exceptions_node().unwrap();
    assert_eq!(doc.parent(second), Some(container));
    assert_eq!(doc.parent(container), Some(root));
    assert_eq!(doc.exceptions().len(), 2);
    assert!(doc.xml_frag().unwrap().starts_with("<page>reset<xao:exceptions"));
}

#[test]
fn throw_skips_attributes_with_bad_names() {
    let mut doc = DomDoc::new("page");
    let error = doc.throw("boom", &[("bad name", "v"), ("code", "E3")]).unwrap();
    assert_eq!(doc.attribute(error, "code").as_deref(), Some("E3"));

    let reparsed = DomDoc::from_data(&doc.xml_doc().unwrap());
    assert_eq!(reparsed.local_name(reparsed.root()), Some("page"));
}

#[test]
fn error_callback_sees_every_exception() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let mut doc = DomDoc::new("page");
    doc.set_error_callback(move |e| sink.borrow_mut().push(e.message.clone()));
    doc.throw("one", &[]);
    doc.throw("two", &[]);
    assert_eq!(*seen.borrow(), ["one", "two"]);
}

#[test]
fn custom_namespace_prefix() {
    let mut doc = DomDoc::new("page");
    doc.set_namespace_prefix("err").unwrap();
    doc.throw("boom", &[]);
    assert!(doc.xml_frag().unwrap().contains("<err:exceptions xmlns:err="));
    assert!(doc.set_namespace_prefix("a:b").is_err());
}

// ============== Queries ==============

#[test]
fn xpath_nodes_in_document_order() {
    let doc = DomDoc::from_data(SIMPLE_XML);
    let nodes = doc.xpath_nodes("//item[@id='3'] | //item[@id='2']").unwrap();
    let texts: Vec<String> = nodes.iter().map(|n| doc.text_content(*n)).collect();
    assert_eq!(texts, ["Second", "Third"]);
    assert_eq!(doc.xpath_string("/catalog/item[@id='3']").unwrap(), "Third");
    assert_eq!(doc.xpath_string("count(//item)").unwrap(), "3");
}

#[test]
fn xpath_prefixes_come_from_the_document() {
    let mut doc = DomDoc::from_data(r#"<a xmlns="urn:d"><b xmlns:p="urn:p"><p:c/></b></a>"#);
    assert_eq!(doc.xpath_nodes("//p:c").unwrap().len(), 1);
    assert!(doc.xpath_nodes("//b").unwrap().is_empty(), "b is in the default namespace");

    doc.throw("noted", &[]);
    assert_eq!(doc.xpath_nodes("//xao:exception").unwrap().len(), 1);
    assert!(matches!(doc.xpath_nodes("//q:c"), Err(DomError::UnboundPrefix(_))));
}

#[test]
fn xpath_errors() {
    let doc = DomDoc::from_data(SIMPLE_XML);
    assert!(matches!(doc.xpath_nodes("//item["), Err(DomError::XPathCompile(_))));
    assert!(matches!(doc.xpath_nodes("//item/@id"), Err(DomError::XPathEval(_))));
    assert!(matches!(doc.xpath_nodes("count(//item)"), Err(DomError::XPathEval(_))));
}

// ============== Custom tags ==============

#[test]
fn custom_tags_run_names_before_queries() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut doc = DomDoc::from_data(SIMPLE_XML);

    let log = Rc::clone(&order);
    doc.set_custom_tag_query("//item[@id='2']", move |doc, node| {
        log.borrow_mut().push(format!("query:{}", doc.text_content(node)));
        Ok(())
    })
    .unwrap();
    let log = Rc::clone(&order);
    doc.set_custom_tag_name("item", move |doc, node| {
        log.borrow_mut().push(format!("name:{}", doc.text_content(node)));
        doc.set_attributes(node, &[("seen", "yes")])
    })
    .unwrap();

    let calls = doc.process_custom_tags().unwrap();
    assert_eq!(calls, 4);
    assert_eq!(
        *order.borrow(),
        ["name:First", "name:Second", "name:Third", "query:Second"]
    );
    assert_eq!(doc.xpath_nodes("//item[@seen='yes']").unwrap().len(), 3);
}

#[test]
fn custom_tag_callbacks_can_replace_nodes() {
    let mut doc = DomDoc::from_data("<page><greeting/><greeting/></page>");
    doc.set_custom_tag_name("greeting", |doc, node| {
        let xot = doc.xot_mut();
        let name = xot.add_name("p");
        let replacement = xot.new_element(name);
        let text = xot.new_text("Hello");
        xot.append(replacement, text)?;
        xot.insert_before(node, replacement)?;
        xot.remove(node)?;
        Ok(())
    })
    .unwrap();
    assert_eq!(doc.process_custom_tags().unwrap(), 2);
    assert_eq!(doc.xml_frag().unwrap(), "<page><p>Hello</p><p>Hello</p></page>");
}

#[test]
fn custom_tag_query_is_compiled_on_registration() {
    let mut doc = DomDoc::new("page");
    let err = doc.set_custom_tag_query("//[", |_, _| Ok(())).unwrap_err();
    assert!(matches!(err, DomError::XPathCompile(_)));
    assert!(doc.set_custom_tag_name("bad name", |_, _| Ok(())).is_err());
}

// ============== Serialization ==============

#[test]
fn serialization_round_trips() {
    let input = r#"<doc a="1"><!--note--><x:y xmlns:x="urn:x">text &amp; more</x:y></doc>"#;
    let doc = DomDoc::from_data(input);
    assert_eq!(doc.xml_frag().unwrap(), input);
}

#[test]
fn xml_doc_has_declaration_and_stylesheet() {
    let mut doc = DomDoc::from_data(r#"<?xml-stylesheet type="text/xsl" href="old.xsl"?><page/>"#);
    doc.set_stylesheet_pi("skins/main.xsl").unwrap();
    doc.set_stylesheet_pi("skins/print.xsl").unwrap();
    assert_eq!(
        doc.xml_doc().unwrap(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <?xml-stylesheet type=\"text/xsl\" href=\"skins/print.xsl\"?>\n\
         <page/>"
    );
}

#[test]
fn doctype_survives_round_trip() {
    let doc = DomDoc::from_data(r#"<!DOCTYPE page SYSTEM "page.dtd"><page><title>Home</title></page>"#);
    assert!(!doc.has_exceptions(), "{:?}", doc.exceptions());
    assert_eq!(
        doc.xml_doc().unwrap(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE page SYSTEM \"page.dtd\">\n\
         <page><title>Home</title></page>"
    );
    assert_eq!(doc.xml_frag().unwrap(), "<page><title>Home</title></page>");
}

#[test]
fn doctype_with_internal_subset_yields_error_element() {
    let doc = DomDoc::from_data(r#"<!DOCTYPE page [<!ENTITY who "ann">]><page>&who;</page>"#);
    assert_eq!(doc.local_name(doc.root()), Some("root"));
    assert!(doc.exceptions()[0].message.contains("internal subset"));
}

#[test]
fn commit_to_file_overwrites_existing_file() {
    let file = xml_file("<previous-content-that-is-longer/>");
    let doc = DomDoc::new("saved");
    doc.commit_to_file(file.path()).unwrap();
    let written = std::fs::read_to_string(file.path()).unwrap();
    assert!(written.ends_with("<saved/>"));
    assert!(!written.contains("previous"));
}

#[test]
fn commit_to_file_requires_target() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing.xml");
    let err = DomDoc::new("saved").commit_to_file(&target).unwrap_err();
    assert!(matches!(err, DomError::FileNotFound(_)));
    assert!(!target.exists());
}
