use crate::pipeline_extras::{
    LISTING_HTML, ROZEY_ARTICLE_CONTENT, ROZEY_ARTICLE_HTML, ROZEY_ARTICLE_URL, ROZEY_CONTENT,
    ROZEY_HTML, SHIKI_HTML,
};
use scraper::Html;
use spectral::prelude::*;
use std::collections::HashMap;
use tablescout::extract::{Extracted, Query, Separator, extract, join_non_absent};
use tablescout::parse::{ArticleRecord, DetailRecord, ListingFields, ListingRecord, pair_features};

mod pipeline_extras;

#[test]
fn join_keeps_present_values() {
    assert_that(&join_non_absent([Some("Wijnhaven 85"), None]))
        .is_equal_to(Some("Wijnhaven 85".to_owned()));
    assert_that(&join_non_absent([Some("Wijnhaven 85"), Some("3011 WK")]))
        .is_equal_to(Some("Wijnhaven 85 3011 WK".to_owned()));
    assert_that(&join_non_absent([None::<&str>, None])).is_none();
}

#[test]
fn extraction_tells_absent_from_present() {
    let document = Html::parse_document(
        r#"<div class="links"><a href="/a">A</a><a href="/b">B</a></div>"#,
    );
    let root = document.root_element();
    let links = Query::attr("div.links a", "href").expect("Expected a valid query.");
    let missing = Query::own_text("div.missing").expect("Expected a valid query.");

    assert_that(&extract(root, &links, Separator::Disabled)).is_equal_to(Some(Extracted::List(
        vec!["/a".to_owned(), "/b".to_owned()],
    )));
    assert_that(&extract(root, &links, Separator::Join(", ")))
        .is_equal_to(Some(Extracted::Text("/a, /b".to_owned())));
    assert_that(&extract(root, &missing, Separator::default())).is_none();
}

#[test]
fn own_text_skips_nested_elements() {
    let document =
        Html::parse_document(r#"<p class="intro">Fresh <b>daily</b> pasta </p>"#);
    let own = Query::own_text("p.intro").expect("Expected a valid query.");
    let all = Query::text("p.intro").expect("Expected a valid query.");

    assert_that(&own.matches(document.root_element()))
        .is_equal_to(vec!["Fresh".to_owned(), "pasta".to_owned()]);
    assert_that(&all.matches(document.root_element())).is_equal_to(vec![
        "Fresh".to_owned(),
        "daily".to_owned(),
        "pasta".to_owned(),
    ]);
}

#[test]
fn features_pair_by_position() {
    let labels = ["A".to_owned(), "B".to_owned()];
    let values = ["x".to_owned(), "y".to_owned()];

    let expected: HashMap<String, String> = [
        ("A".to_owned(), "x".to_owned()),
        ("B".to_owned(), "y".to_owned()),
    ]
    .into_iter()
    .collect();
    assert_that(&pair_features(&labels, &values)).is_equal_to(expected);
}

#[test]
fn features_stop_at_the_shorter_list() {
    let labels = ["A".to_owned(), "B".to_owned(), "C".to_owned()];
    let values = ["x".to_owned()];

    let features = pair_features(&labels, &values);

    assert_that(&features.len()).is_equal_to(1);
    assert_that(&features.get("A")).is_equal_to(Some(&"x".to_owned()));
}

#[test]
fn surplus_feature_values_are_dropped() {
    let labels = ["A".to_owned(), "B".to_owned()];
    let values = ["x".to_owned(), "y".to_owned(), "z".to_owned()];

    let expected: HashMap<String, String> = [
        ("A".to_owned(), "x".to_owned()),
        ("B".to_owned(), "y".to_owned()),
    ]
    .into_iter()
    .collect();
    assert_that(&pair_features(&labels, &values)).is_equal_to(expected);
}

#[test]
fn detail_page_with_extra_feature_value() {
    let html = r#"<html><body>
        <div class="block-content">
          <dl>
            <dt>Maaltijd</dt><dd>Lunch</dd><dd>Extra</dd>
          </dl>
        </div>
    </body></html>"#;

    let detail = DetailRecord::parse("Anker", html);

    assert_that(&detail.features().len()).is_equal_to(1);
    assert_that(&detail.to_fields().meal_type).is_equal_to(Some("Lunch".to_owned()));
}

#[test]
fn listing_rows_are_parsed_in_order() {
    let records = ListingRecord::parse_all(LISTING_HTML);

    let open: Vec<bool> = records.iter().map(ListingRecord::is_open).collect();
    assert_that(&open).is_equal_to(vec![true, false, true, false, true]);

    let fields: Vec<ListingFields> = records.iter().map(ListingRecord::to_fields).collect();
    assert_that(&fields.first()).is_equal_to(Some(&ListingFields {
        name: Some("Rozey".to_owned()),
        detail_url: Some("/rotterdam/restaurant/rozey".to_owned()),
        image_url: Some("https://img.example/rozey.jpg".to_owned()),
    }));
    assert_that(&fields.get(2)).is_equal_to(Some(&ListingFields::default()));
    assert_that(&fields.get(4).and_then(|row| row.name.clone()))
        .is_equal_to(Some("Shiki Sushi & Lounge".to_owned()));
}

#[test]
fn detail_page_fields() {
    let detail = DetailRecord::parse("Rozey", ROZEY_HTML);

    assert_that(&detail.name()).is_equal_to("Rozey");
    assert_that(&detail.address()).is_equal_to(Some("Wijnhaven 85 3011 WK".to_owned()));
    assert_that(&detail.tags()).is_equal_to(Some("Labels: Vegetarisch, Wereldkeuken.".to_owned()));
    assert_that(&detail.website_url()).is_equal_to(Some("https://rozey.example"));
    assert_that(&detail.social_url()).is_equal_to(Some("https://instagram.com/rozey"));
    assert_that(&detail.has_info()).is_true();
    assert_that(&detail.content()).is_equal_to(Some(ROZEY_CONTENT.to_owned()));
    assert_that(&detail.articles().to_vec()).is_equal_to(vec![ROZEY_ARTICLE_URL.to_owned()]);

    let entity = detail.to_fields();
    assert_that(&entity.meal_type).is_equal_to(Some("Lunch, Diner".to_owned()));
    assert_that(&entity.district).is_equal_to(Some("Centrum".to_owned()));
    assert_that(&entity.kind).is_equal_to(Some("Restaurant".to_owned()));
    assert_that(&entity.price_tier).is_equal_to(Some("Betaalbaar".to_owned()));
}

#[test]
fn sparse_detail_page_leaves_fields_absent() {
    let detail = DetailRecord::parse("Shiki", SHIKI_HTML);

    assert_that(&detail.address()).is_equal_to(Some("Prins Alexanderlaan 37A".to_owned()));
    assert_that(&detail.tags()).is_none();
    assert_that(&detail.website_url()).is_none();
    assert_that(&detail.has_info()).is_false();
    assert_that(&detail.content()).is_none();
    assert_that(&detail.has_articles()).is_false();

    let entity = detail.to_fields();
    assert_that(&entity.meal_type).is_equal_to(Some("Diner".to_owned()));
    assert_that(&entity.district).is_equal_to(Some("Oost".to_owned()));
    assert_that(&entity.kind).is_none();
    assert_that(&entity.price_tier).is_none();
}

#[test]
fn article_content_orders_body_subheadings_title() {
    let article = ArticleRecord::parse("Rozey", ROZEY_ARTICLE_URL, ROZEY_ARTICLE_HTML);

    let document = article.to_fields();
    assert_that(&document.name).is_equal_to("Rozey".to_owned());
    assert_that(&document.source_url).is_equal_to(ROZEY_ARTICLE_URL.to_owned());
    assert_that(&document.content).is_equal_to(Some(ROZEY_ARTICLE_CONTENT.to_owned()));
}

#[test]
fn empty_article_has_no_content() {
    let article = ArticleRecord::parse("Rozey", ROZEY_ARTICLE_URL, "<html><body></body></html>");

    assert_that(&article.content()).is_none();
}
