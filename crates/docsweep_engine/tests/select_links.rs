use docsweep_core::SelectorTables;
use docsweep_engine::{contains_cyrillic, LinkSelector, SelectedLink};
use pretty_assertions::assert_eq;

fn page(body: &str) -> Vec<u8> {
    format!("<html><head><meta charset=\"utf-8\"></head><body>{body}</body></html>").into_bytes()
}

fn selector() -> LinkSelector {
    LinkSelector::new(SelectorTables::default())
}

#[test]
fn page_without_cyrillic_yields_nothing() {
    sweep_logging::initialize_for_tests();
    let anchors = (0..5)
        .map(|i| format!(r#"<a href="https://a.example/{i}.pdf">Terms {i}</a>"#))
        .collect::<String>();
    let links = selector().select(&page(&anchors)).unwrap();
    assert!(links.is_empty());
}

#[test]
fn small_page_passes_every_document_link() {
    let mut body = String::from("<p>Документы</p>");
    for i in 0..5 {
        body.push_str(&format!(r#"<a href="https://a.example/{i}.pdf">Файл {i}</a>"#));
    }
    body.push_str(r#"<a href="https://a.example/index.html">Главная</a>"#);

    let links = selector().select(&page(&body)).unwrap();
    assert_eq!(links.len(), 5);
    assert_eq!(
        links[0],
        SelectedLink {
            href: "https://a.example/0.pdf".to_string(),
            text: Some("Файл 0".to_string()),
        }
    );
}

#[test]
fn large_page_keeps_only_keyword_links() {
    let mut body = String::new();
    for i in 0..12 {
        body.push_str(&format!(r#"<a href="https://a.example/price{i}.xlsx">Прайс {i}</a>"#));
    }
    body.push_str(r#"<a href="https://a.example/offer.pdf">Публичная оферта</a>"#);
    body.push_str(r#"<a href="https://a.example/privacy.docx">Политика конфиденциальности</a>"#);
    body.push_str(r#"<a href="https://a.example/dogovor.rtf" title="Договор">скачать</a>"#);

    let links = selector().select(&page(&body)).unwrap();
    let hrefs: Vec<_> = links.iter().map(|l| l.href.as_str()).collect();
    assert_eq!(
        hrefs,
        vec![
            "https://a.example/offer.pdf",
            "https://a.example/privacy.docx",
            "https://a.example/dogovor.rtf",
        ]
    );
}

#[test]
fn exactly_threshold_links_are_not_filtered() {
    let mut body = String::from("Каталог");
    for i in 0..10 {
        body.push_str(&format!(r#"<a href="/files/{i}.csv">{i}</a>"#));
    }
    let links = selector().select(&page(&body)).unwrap();
    assert_eq!(links.len(), 10);
    assert_eq!(links[3].href, "/files/3.csv");
}

#[test]
fn cyrillic_in_markup_alone_opens_the_gate() {
    let body = r#"<a href="https://a.example/x.doc" title="файл">download</a>"#;
    let links = selector().select(&page(body)).unwrap();
    assert_eq!(links.len(), 1);
}

#[test]
fn anchors_without_href_or_document_extension_are_ignored() {
    let body = r#"Текст <a name="top">x</a><a href="https://a.example/report.pdf?x=1">y</a>"#;
    let links = selector().select(&page(body)).unwrap();
    assert!(links.is_empty());
}

#[test]
fn per_page_limit_is_enforced() {
    let mut body = String::from("Текст");
    for i in 0..4 {
        body.push_str(&format!(r#"<a href="https://a.example/{i}.pdf">{i}</a>"#));
    }
    let selector = LinkSelector::with_max_links(SelectorTables::default(), 2);
    let links = selector.select(&page(&body)).unwrap();
    assert_eq!(links.len(), 2);
}

#[test]
fn stray_bytes_do_not_hide_the_page_links() {
    let mut bytes = "<html><head><meta charset=\"utf-8\"></head><body><p>Договор</p>"
        .as_bytes()
        .to_vec();
    bytes.push(0xFF);
    for i in 0..5 {
        bytes.extend_from_slice(format!(r#"<a href="https://a.example/{i}.pdf">Файл</a>"#).as_bytes());
    }
    bytes.extend_from_slice(b"</body></html>");

    let links = selector().select(&bytes).unwrap();
    assert_eq!(links.len(), 5);
    assert_eq!(links[4].href, "https://a.example/4.pdf");
}

#[test]
fn undecodable_page_without_cyrillic_still_yields_nothing() {
    let bytes = b"<meta charset=utf-8>\xFF\xFE\xFD<a href=\"https://a.example/x.pdf\">x</a>";
    assert!(selector().select(bytes).unwrap().is_empty());
}

#[test]
fn cyrillic_detection_covers_the_whole_block() {
    assert!(contains_cyrillic("abc ё"));
    assert!(contains_cyrillic("\u{0400}"));
    assert!(!contains_cyrillic("plain ascii, ümlaut"));
}
