use rstest::{fixture, rstest};
use xferlang::{Document, DocumentMetadata, ElementId, ElementKind, ElementType, ErrorCode, parse, to_text};

#[fixture]
fn inventory() -> Document {
    parse(
        "{ <!id \"shelf\"!> shelf [ <!tag \"fruit\"!> \"apple\" <!tag \"fruit\"!> \"pear\" \"nail\" ] <!id \"count\"!> count 3 }",
    )
    .unwrap()
}

fn root(doc: &Document) -> ElementId {
    doc.root().expect("root")
}

#[rstest]
fn navigation(inventory: Document) {
    let shelf_pair = inventory.find_by_id("shelf").unwrap();
    let shelf = inventory.kvp_value(shelf_pair).unwrap();
    let first = inventory.get_at(shelf, 0).unwrap();
    assert_eq!(inventory.kind(first), &ElementKind::string("apple"));
    let tag_pi = inventory.next_sibling(first).unwrap();
    assert!(matches!(inventory.kind(tag_pi), ElementKind::ProcessingInstruction(_)));
    let second = inventory.get_at(shelf, 1).unwrap();
    assert_eq!(inventory.kind(second), &ElementKind::string("pear"));
    assert_eq!(inventory.next_sibling(tag_pi), Some(second));
    assert_eq!(inventory.previous_sibling(second), Some(tag_pi));
    assert_eq!(inventory.ancestors(first).collect::<Vec<_>>(), vec![shelf, shelf_pair, root(&inventory)]);
    assert!(inventory.is_ancestor(root(&inventory), first));
    assert_eq!(inventory.last_child(shelf).map(|c| inventory.kind(c).clone()), Some(ElementKind::string("nail")));
    assert!(inventory.contains_key(root(&inventory), "count"));
}

#[rstest]
fn element_refs(inventory: Document) {
    let r = inventory.root_element().unwrap();
    let shelf = r.get("shelf").unwrap();
    assert_eq!(shelf.semantic_children().count(), 3);
    let apple = shelf.get_at(0).unwrap();
    assert_eq!(apple.tag(), Some("fruit"));
    assert_eq!(apple.text().as_deref(), Some("apple"));
    assert_eq!(apple.parent().map(|p| p.id()), Some(shelf.id()));
    let count = inventory.element(inventory.find_by_id("count").unwrap());
    assert_eq!(count.key(), Some("count"));
    assert_eq!(count.element_id(), Some("count"));
    assert_eq!(count.value().map(|v| v.kind().clone()), Some(ElementKind::Integer(3)));
}

#[rstest]
fn queries(inventory: Document) {
    let fruit = inventory.elements_by_tag("fruit");
    assert_eq!(fruit.len(), 2);
    let numbers = inventory.find_elements(|kind| matches!(kind, ElementKind::Integer(_)));
    assert_eq!(numbers.len(), 1);
    let shelf = inventory.kvp_value(inventory.find_by_id("shelf").unwrap()).unwrap();
    let short = inventory.descendants_where(shelf, |kind| kind.scalar_text().is_some_and(|s| s.len() == 4));
    assert_eq!(short.len(), 2);
}

#[rstest]
fn removing_drops_ids_and_tags(mut inventory: Document) {
    let shelf_pair = inventory.find_by_id("shelf").unwrap();
    assert!(inventory.remove(shelf_pair));
    assert!(inventory.find_by_id("shelf").is_none());
    assert_eq!(inventory.tag_count("fruit"), 0);
    assert!(!inventory.remove(shelf_pair));
    assert!(!to_text(&inventory).contains("apple"));
}

#[rstest]
fn arrays_stay_homogeneous(mut inventory: Document) {
    let shelf = inventory.kvp_value(inventory.find_by_id("shelf").unwrap()).unwrap();
    let number = inventory.create(ElementKind::Integer(1));
    assert_eq!(inventory.add(shelf, number).unwrap_err().code, ErrorCode::TypeMismatch);

    assert_eq!(inventory.remove_all_children(shelf), 5);
    assert_eq!(inventory.kind(shelf), &ElementKind::Array { element_type: None });
    inventory.add(shelf, number).unwrap();
    assert_eq!(inventory.kind(shelf), &ElementKind::Array { element_type: Some(ElementType::Integer) });
}

#[rstest]
fn object_edits(mut inventory: Document) {
    let object = root(&inventory);
    let five = inventory.create(ElementKind::Integer(5));
    let pair = inventory.add_or_update(object, "count", five).unwrap();
    assert_eq!(inventory.find_by_id("count"), Some(pair));
    assert_eq!(inventory.keys(object), vec!["shelf", "count"]);
    assert_eq!(inventory.kind(inventory.object_get(object, "count").unwrap()), &ElementKind::Integer(5));

    let label = inventory.create(ElementKind::string("A1"));
    inventory.add_pair(object, "label", label).unwrap();
    let again = inventory.create(ElementKind::string("A2"));
    assert_eq!(inventory.add_pair(object, "label", again).unwrap_err().code, ErrorCode::DuplicateKey);
    assert!(inventory.remove_key(object, "label"));
    assert!(!inventory.contains_key(object, "label"));
}

#[rstest]
fn replace_and_insert(mut inventory: Document) {
    let shelf = inventory.kvp_value(inventory.find_by_id("shelf").unwrap()).unwrap();
    let nail = inventory.last_child(shelf).unwrap();
    let plum = inventory.create(ElementKind::string("plum"));
    inventory.replace_child(shelf, nail, plum).unwrap();
    let fig = inventory.create(ElementKind::string("fig"));
    inventory.insert(shelf, 0, fig).unwrap();
    let texts: Vec<String> = inventory.semantic_children(shelf).filter_map(|c| inventory.kind(c).scalar_text()).collect();
    assert_eq!(texts, vec!["fig", "apple", "pear", "plum"]);

    let stranger = inventory.create(ElementKind::string("x"));
    let other = inventory.create(ElementKind::string("y"));
    assert_eq!(inventory.replace_child(shelf, stranger, other).unwrap_err().code, ErrorCode::NotAChild);
}

#[rstest]
fn structural_misuse_is_rejected(mut inventory: Document) {
    let object = root(&inventory);
    let shelf = inventory.kvp_value(inventory.find_by_id("shelf").unwrap()).unwrap();
    assert_eq!(inventory.add(shelf, object).unwrap_err().code, ErrorCode::InvalidOperation);
    let leaf = inventory.get_at(shelf, 0).unwrap();
    let child = inventory.create(ElementKind::Null);
    assert_eq!(inventory.add(leaf, child).unwrap_err().code, ErrorCode::InvalidOperation);
    let loose = inventory.create(ElementKind::Integer(1));
    assert_eq!(inventory.add(object, loose).unwrap_err().code, ErrorCode::TypeMismatch);
}

#[rstest]
fn moving_an_element_detaches_it(mut inventory: Document) {
    let object = root(&inventory);
    let shelf = inventory.kvp_value(inventory.find_by_id("shelf").unwrap()).unwrap();
    let apple = inventory.get_at(shelf, 0).unwrap();
    let basket = inventory.create(ElementKind::empty_array());
    inventory.add_pair(object, "basket", basket).unwrap();
    inventory.add(basket, apple).unwrap();
    assert_eq!(inventory.parent(apple), Some(basket));
    assert_eq!(inventory.semantic_count(shelf), 2);
    assert_eq!(inventory.elements_by_tag("fruit").len(), 2);
}

#[rstest]
fn ids_are_unique_across_the_document(mut inventory: Document) {
    let shelf = inventory.kvp_value(inventory.find_by_id("shelf").unwrap()).unwrap();
    let pear = inventory.get_at(shelf, 1).unwrap();
    assert_eq!(inventory.set_id(pear, "count").unwrap_err().code, ErrorCode::DuplicateId);
    inventory.set_id(pear, "pear").unwrap();
    inventory.set_id(pear, "best-pear").unwrap();
    assert!(inventory.find_by_id("pear").is_none());
    assert_eq!(inventory.find_by_id("best-pear"), Some(pear));
    assert_eq!(inventory.set_tag(pear, "green").unwrap_err().code, ErrorCode::DuplicateTag);
    inventory.clear_tag(pear);
    inventory.set_tag(pear, "green").unwrap();
    assert_eq!(inventory.all_tags(), vec!["fruit", "green"]);
}

#[rstest]
fn deep_clone_is_detached_and_drops_ids(mut inventory: Document) {
    let shelf_pair = inventory.find_by_id("shelf").unwrap();
    let copy = inventory.deep_clone(shelf_pair);
    assert_ne!(copy, shelf_pair);
    assert_eq!(inventory.parent(copy), None);
    assert_eq!(inventory.node(copy).id(), None);
    let copied_array = inventory.kvp_value(copy).unwrap();
    assert_eq!(inventory.semantic_count(copied_array), 3);
    assert_eq!(inventory.node(inventory.get_at(copied_array, 0).unwrap()).tag(), Some("fruit"));
    assert_eq!(inventory.find_by_id("shelf"), Some(shelf_pair));
}

#[test]
fn building_a_document() {
    let mut doc = Document::new();
    let object = doc.create(ElementKind::Object);
    let name = doc.create(ElementKind::string("Ada"));
    doc.add_pair(object, "name", name).unwrap();
    doc.set_root(object).unwrap();
    let comment = doc.create(ElementKind::Comment(" generated ".into()));
    doc.insert_top_level(0, comment).unwrap();
    assert_eq!(to_text(&doc), "</ generated />{name\"Ada\"}");

    let other = doc.create(ElementKind::Integer(1));
    assert_eq!(doc.push_top_level(other).unwrap_err().code, ErrorCode::MultipleRoots);
    doc.set_root(other).unwrap();
    assert_eq!(to_text(&doc), "</ generated />1");
}

#[test]
fn metadata_round_trips_through_an_instruction() {
    let mut doc = Document::new();
    let root = doc.create(ElementKind::Object);
    doc.set_root(root).unwrap();
    let mut meta = DocumentMetadata::new();
    meta.title = Some("Catalog".into());
    meta.version = Some("2".into());
    meta.set_custom("team", "data");
    doc.set_metadata(&meta).unwrap();

    let text = to_text(&doc);
    assert!(text.starts_with("<!document"), "{text}");
    let back = parse(&text).unwrap();
    assert_eq!(back.metadata(), Some(meta));
}
