use chrono::{TimeZone, Utc};
use metacat::core::catalog::Catalog;
use metacat::core::config::Config;
use metacat::core::error::ErrorKind;
use metacat::core::types::{BoundingBox, Record};
use metacat::query::ast::{FilterChain, FilterExpression, RangeBound};
use metacat::schema::schema::Schema;
use metacat::search::sort::{SortKey, SortSpec, SortType};

fn schema() -> Schema {
    Schema::catalog_default().add_number_field("size")
}

fn open() -> Catalog {
    Catalog::open(schema(), Config::default()).unwrap()
}

fn three_records() -> Catalog {
    let catalog = open();
    catalog
        .add_batch(&[
            Record::new("a").with_text("type", "x").with_text("title", "Coastal erosion survey"),
            Record::new("b").with_text("type", "y").with_text("title", "Ocean temperature"),
            Record::new("c").with_text("type", "x").with_text("title", "Ocean salinity"),
        ])
        .unwrap();
    catalog.refresh().unwrap();
    catalog
}

fn matched(catalog: &Catalog, constraint: &str) -> Vec<String> {
    let chain = catalog.parse(constraint).unwrap();
    catalog.execute(&chain, None).unwrap().identifiers()
}

#[test]
fn test_and_not_is_set_difference() {
    let catalog = three_records();
    assert_eq!(matched(&catalog, "type:x AND NOT id:a"), vec!["c"]);
    assert_eq!(matched(&catalog, "type:x NOT id:a"), vec!["c"]);
}

#[test]
fn test_fold_is_left_to_right() {
    let catalog = three_records();
    // (type:y OR id:a) AND type:x
    assert_eq!(matched(&catalog, "type:y OR id:a AND type:x"), vec!["a"]);
    assert_eq!(matched(&catalog, "type:y OR (id:a AND type:x)"), vec!["a", "b"]);
    // (type:y OR type:x) AND NOT id:c
    assert_eq!(matched(&catalog, "type:y OR type:x AND NOT id:c"), vec!["a", "b"]);
}

#[test]
fn test_chain_built_in_code_matches_parsed_chain() {
    let catalog = three_records();
    let built = FilterChain::leaf(FilterExpression::equals("title", "ocean"))
        .and(FilterExpression::equals("type", "x"));
    let results = catalog.execute(&built, None).unwrap();
    assert_eq!(results.identifiers(), vec!["c"]);
    assert_eq!(matched(&catalog, "title:ocean AND type:x"), vec!["c"]);
}

#[test]
fn test_leading_not_and_match_all() {
    let catalog = three_records();
    assert_eq!(matched(&catalog, "NOT type:x"), vec!["b"]);
    assert_eq!(matched(&catalog, "*:*"), vec!["a", "b", "c"]);
    assert_eq!(matched(&catalog, ""), vec!["a", "b", "c"]);
}

#[test]
fn test_numeric_range_and_descending_sort() {
    let catalog = open();
    for value in [5.0, 10.0, 15.0, 20.0, 25.0] {
        catalog
            .add_or_replace(&Record::new(format!("s{}", value)).with_number("size", value))
            .unwrap();
    }
    catalog.refresh().unwrap();

    let chain = FilterChain::leaf(FilterExpression::range(
        "size",
        RangeBound::Inclusive("10".into()),
        RangeBound::Inclusive("20".into()),
    ));
    let unsorted = catalog.execute(&chain, None).unwrap();
    assert_eq!(unsorted.total_matched(), 3);

    let sort = SortSpec::by(SortKey::descending("size", SortType::Double));
    let sorted = catalog.execute(&chain, Some(&sort)).unwrap();
    assert_eq!(sorted.identifiers(), vec!["s20", "s15", "s10"]);

    assert_eq!(matched(&catalog, "size:{10 TO 20}"), vec!["s15"]);
    assert_eq!(matched(&catalog, "size:[* TO 10]"), vec!["s10", "s5"]);
}

#[test]
fn test_double_sort_is_numeric() {
    let catalog = open();
    for value in [100.0, 9.0, 10.0] {
        catalog
            .add_or_replace(&Record::new(format!("n{}", value)).with_number("size", value))
            .unwrap();
    }
    catalog.refresh().unwrap();

    let sort = SortSpec::by(SortKey::ascending("size", SortType::Double));
    let results = catalog.execute(&FilterChain::match_all(), Some(&sort)).unwrap();
    assert_eq!(results.identifiers(), vec!["n9", "n10", "n100"]);
}

#[test]
fn test_date_range_covers_whole_day() {
    let catalog = open();
    let at = |d: u32, h: u32| Utc.with_ymd_and_hms(2021, 3, d, h, 0, 0).unwrap();
    catalog
        .add_batch(&[
            Record::new("early").with_date("modified", at(1, 0)),
            Record::new("late").with_date("modified", at(1, 23)),
            Record::new("next").with_date("modified", at(2, 8)),
        ])
        .unwrap();
    catalog.refresh().unwrap();

    assert_eq!(matched(&catalog, "modified:\"2021-03-01\""), vec!["early", "late"]);
    assert_eq!(matched(&catalog, "modified:[2021-03-02 TO *]"), vec!["next"]);

    let sort = SortSpec::by(SortKey::descending("modified", SortType::Date));
    let results = catalog.execute(&FilterChain::match_all(), Some(&sort)).unwrap();
    assert_eq!(results.identifiers(), vec!["next", "late", "early"]);
}

#[test]
fn test_wildcards() {
    let catalog = three_records();
    assert_eq!(matched(&catalog, "title:oce*"), vec!["b", "c"]);
    assert_eq!(matched(&catalog, "title:sal?nity"), vec!["c"]);
    assert!(matched(&catalog, "title:zz*").is_empty());
}

#[test]
fn test_bbox_intersection_and_crs() {
    let catalog = open();
    catalog
        .add_batch(&[
            Record::new("europe").with_bbox("boundingbox", BoundingBox::new(-10.0, 35.0, 30.0, 70.0, "CRS:84")),
            Record::new("pacific").with_bbox("boundingbox", BoundingBox::new(150.0, -30.0, 180.0, 10.0, "EPSG:4326")),
            Record::new("nowhere"),
        ])
        .unwrap();
    catalog.refresh().unwrap();

    assert_eq!(matched(&catalog, "BBOX(0, 40, 5, 45)"), vec!["europe"]);
    assert_eq!(matched(&catalog, "BBOX(-180, -90, 180, 90) AND NOT id:europe"), vec!["pacific"]);

    let chain = catalog.parse("BBOX(0, 0, 1, 1, EPSG:3857)").unwrap();
    let err = catalog.execute(&chain, None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::QuerySyntax);
    assert_eq!(err.parameter.as_deref(), Some("crs"));
}

#[test]
fn test_remove_becomes_visible_on_refresh() {
    let catalog = three_records();
    assert!(catalog.remove("c"));
    assert!(!catalog.remove("never-indexed"));
    assert_eq!(matched(&catalog, "type:x"), vec!["a", "c"]);

    catalog.refresh().unwrap();
    assert_eq!(matched(&catalog, "type:x"), vec!["a"]);
    assert!(catalog.lookup_exact("c").is_none());
}

#[test]
fn test_replace_keeps_one_live_copy() {
    let catalog = three_records();
    catalog
        .add_or_replace(&Record::new("a").with_text("type", "y"))
        .unwrap();
    catalog.refresh().unwrap();

    assert_eq!(matched(&catalog, "type:x"), vec!["c"]);
    assert_eq!(matched(&catalog, "type:y"), vec!["a", "b"]);
    assert_eq!(catalog.stats().live_records, 3);
}

#[test]
fn test_lookup_exact_is_idempotent() {
    let catalog = three_records();
    let first = catalog.lookup_exact("b");
    assert_eq!(first, catalog.lookup_exact("b"));
    assert_eq!(first.map(|id| id.to_string()), Some("b".to_string()));
    assert!(catalog.lookup_exact("B").is_none());
}

#[test]
fn test_syntax_errors_name_the_constraint() {
    let catalog = open();
    for bad in ["(type:x", "type:[1 TO", "AND", "BBOX(1,2,3)"] {
        let err = catalog.parse(bad).unwrap_err();
        assert_eq!(err.kind, ErrorKind::QuerySyntax, "{}", bad);
        assert_eq!(err.parameter.as_deref(), Some("constraint"), "{}", bad);
    }
}

#[test]
fn test_invalid_batch_applies_nothing() {
    let catalog = open();
    let err = catalog
        .add_batch(&[
            Record::new("ok").with_number("size", 1.0),
            Record::new("bad").with_text("size", "not a number"),
        ])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidRecord);

    catalog.refresh().unwrap();
    assert_eq!(catalog.stats().live_records, 0);
}
