use css_sieve_lib::error::QueryError;
use css_sieve_lib::sieve_generate::css_sieve;
use css_sieve_lib::style::owned_css::{AtRuleBody, OwnedDeclaration, OwnedNode, OwnedRule};
use css_sieve_lib::{
    parse_stylesheet, BoundDocument, DocumentQuery, OwnedStylesheet, Sieve, SieveError, SieveOptions,
};
use pretty_assertions::assert_eq;

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><title>Sieve</title></head>
<body>
  <header id="top" class="banner">
    <nav><a href="/" class="logo">Home</a><a href="/docs">Docs</a></nav>
  </header>
  <main>
    <ul class="list">
      <li class="item">one</li>
      <li class="item active">two</li>
      <li class="item">three</li>
    </ul>
    <form><input type="text" required><input type="checkbox" checked disabled></form>
    <svg><circle r="4"></circle></svg>
  </main>
</body>
</html>"#;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sieve() -> Sieve {
    init_logger();
    Sieve::new(SieveOptions::new(PAGE)).unwrap()
}

fn prune(css: &str) -> OwnedStylesheet {
    let mut sheet = parse_stylesheet(css).unwrap();
    sieve().apply(&mut sheet).unwrap();
    sheet
}

/// Selector lists of every style rule, in document order.
fn selector_lists(nodes: &[OwnedNode]) -> Vec<Vec<String>> {
    let mut lists = Vec::new();
    for node in nodes {
        match node {
            OwnedNode::Style(rule) => {
                lists.push(rule.selectors.clone());
                lists.extend(selector_lists(&rule.rules));
            }
            OwnedNode::AtRule(at_rule) => {
                if let AtRuleBody::Rules(children) = &at_rule.body {
                    lists.extend(selector_lists(children));
                }
            }
        }
    }
    lists
}

fn at_rule_names(sheet: &OwnedStylesheet) -> Vec<String> {
    sheet
        .rules
        .iter()
        .filter_map(|node| match node {
            OwnedNode::AtRule(at_rule) => Some(format!("{} {}", at_rule.name, at_rule.prelude)),
            OwnedNode::Style(_) => None,
        })
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn live_selectors_are_kept_verbatim() {
    let sheet = prune(".banner nav > a, #top { color: red }");
    assert_eq!(selector_lists(&sheet.rules), vec![strings(&[".banner nav > a", "#top"])]);
}

#[test]
fn dead_rules_are_removed() {
    let sheet = prune(".missing { color: red } table td { color: blue } li { margin: 0 }");
    assert_eq!(selector_lists(&sheet.rules), vec![strings(&["li"])]);
}

#[test]
fn partially_live_rules_keep_live_selectors() {
    let sheet = prune("a, b, .active { color: red }");
    assert_eq!(selector_lists(&sheet.rules), vec![strings(&["a", ".active"])]);
}

#[test]
fn keyframe_blocks_survive() {
    let sheet = prune(
        "@keyframes fade { from { opacity: 0 } 50% { opacity: .5 } to { opacity: 1 } }
         .active { animation: fade 1s }",
    );
    let frames = sheet
        .rules
        .iter()
        .find_map(|node| match node {
            OwnedNode::AtRule(at_rule) if at_rule.name == "keyframes" => Some(&at_rule.body),
            _ => None,
        })
        .expect("keyframes kept");
    match frames {
        AtRuleBody::Rules(blocks) => assert_eq!(blocks.len(), 3),
        other => panic!("unexpected keyframes body {:?}", other),
    }
}

#[test]
fn pseudo_elements_are_judged_by_their_element() {
    let sheet = prune(
        "::selection { color: red }
         .item::before { content: '-' }
         p::after { content: '-' }",
    );
    let lists = selector_lists(&sheet.rules);
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[0], strings(&["::selection"]));
    assert_eq!(lists[1], strings(&[".item::before"]));
}

#[test]
fn emptied_at_rules_cascade_away() {
    let sheet = prune(
        "@media (min-width: 1px) { .dead { color: red } }
         @supports (display: grid) { @media print { .gone { color: red } } }
         @media print { li { color: red } }",
    );
    assert_eq!(at_rule_names(&sheet), vec!["media print"]);
}

#[test]
fn pruning_is_idempotent() {
    init_logger();
    let css = "li.item, .nothing { color: red }
               @media print { .nothing { color: red } nav a { color: blue } }
               @media screen { @keyframes spin { to { opacity: 0 } } }
               @supports (display: grid) { @media screen { @keyframes spin { to { opacity: 0 } } } }
               ::selection { color: red }";
    let once = css_sieve::generate(PAGE, css).unwrap();
    let twice = css_sieve::generate(PAGE, &once).unwrap();
    assert_eq!(once, twice);
    assert!(!once.contains("screen"), "{}", once);
    assert!(!once.contains("@supports"), "{}", once);
}

#[test]
fn source_text_is_kept_as_written() {
    init_logger();
    let css = "p::after, .item::before { content: url(a.png); color: #FF0000 }
               li.item {
                 margin: 0px 0px; /* reset */
                 background: URL( 'b.png' ) no-repeat !important;
               }
               @media (min-width:1px) { nav  >  a { padding: 0px } }";
    let out = css_sieve::generate(PAGE, css).unwrap();

    let expected = r#".item::before {
  content: url(a.png);
  color: #FF0000;
}

li.item {
  margin: 0px 0px;
  background: URL( 'b.png' ) no-repeat !important;
}

@media (min-width:1px) {
  nav  >  a {
    padding: 0px;
  }
}
"#;
    assert_eq!(out, expected);
}

#[test]
fn surviving_rules_keep_their_order() {
    let sheet = prune(
        "li { color: red }
         .nothing { color: red }
         nav { color: red }
         header { color: red }
         a { color: red }",
    );
    assert_eq!(
        selector_lists(&sheet.rules),
        vec![strings(&["li"]), strings(&["nav"]), strings(&["header"]), strings(&["a"])]
    );
}

#[test]
fn invalid_selectors_abort_the_run() {
    let sieve = sieve();
    let mut sheet = OwnedStylesheet::new(vec![
        OwnedRule::new(["li"], vec![OwnedDeclaration::new("color", "red")]).into(),
        OwnedRule::new(["a[href"], vec![OwnedDeclaration::new("color", "red")]).into(),
    ]);

    match sieve.apply(&mut sheet) {
        Err(SieveError::SelectorQuery { selector, source }) => {
            assert_eq!(selector, "a[href");
            assert_eq!(source, QueryError::Unclosed('['));
        }
        other => panic!("expected a selector error, got {:?}", other),
    }
}

#[test]
fn unknown_pseudo_classes_abort_the_run() {
    let sieve = sieve();
    let mut sheet = OwnedStylesheet::new(vec![
        OwnedRule::new([".item:frobnicate::before"], vec![OwnedDeclaration::new("color", "red")]).into(),
    ]);
    let err = sieve.apply(&mut sheet).unwrap_err();
    assert!(matches!(
        err,
        SieveError::SelectorQuery {
            source: QueryError::UnsupportedPseudoClass(_),
            ..
        }
    ));
}

#[test]
fn missing_document_is_a_configuration_error() {
    assert!(matches!(
        Sieve::new(SieveOptions::default()),
        Err(SieveError::Configuration(_))
    ));
    assert!(matches!(
        css_sieve::generate("   ", "a { color: red }"),
        Err(SieveError::Configuration(_))
    ));
}

#[test]
fn unreferenced_definitions_are_discarded() {
    let sheet = prune(
        r#"@namespace svg url(http://www.w3.org/2000/svg);
           @keyframes spin { to { transform: rotate(1turn) } }
           @keyframes pulse { to { opacity: 0 } }
           @font-face { font-family: "Open Sans"; src: url(open.woff) }
           @font-face { font-family: Lato; src: url(lato.woff) }
           @counter-style thumbs { system: cyclic; symbols: "*"; suffix: " " }
           body { font-family: "Open Sans", sans-serif }
           .list { list-style-type: thumbs }
           .active { animation: pulse 2s infinite }"#,
    );
    let names = at_rule_names(&sheet);
    assert_eq!(names.len(), 3, "{:?}", names);
    assert!(names.iter().any(|n| n == "keyframes pulse"));
    assert!(names.iter().any(|n| n == "counter-style thumbs"));
    assert!(names.iter().any(|n| n.starts_with("font-face")));
    assert!(!names.iter().any(|n| n.starts_with("namespace")));
}

#[test]
fn query_engine_follows_selectors_level_4() {
    let document = BoundDocument::parse(PAGE);
    let count = |selector: &str| document.count_matches(selector).unwrap();

    assert_eq!(count("li"), 3);
    assert_eq!(count("ul > li + li"), 2);
    assert_eq!(count("li ~ .active"), 1);
    assert_eq!(count("a[href^='/']"), 2);
    assert_eq!(count("a[href='/docs' i]"), 1);
    assert_eq!(count("li:nth-child(odd)"), 2);
    assert_eq!(count("li:last-child"), 1);
    assert_eq!(count("li:not(.active)"), 2);
    assert_eq!(count(":is(header, main) > *"), 4);
    assert_eq!(count("ul:has(> .active)"), 1);
    assert_eq!(count("input:required"), 1);
    assert_eq!(count("input:checked:disabled"), 1);
    assert_eq!(count("html:root"), 1);
    assert_eq!(count("a:hover"), 2);
    assert_eq!(count("svg circle"), 1);
    assert_eq!(count("title:empty"), 0);
}

#[test]
fn a_bound_document_can_serve_several_threads() {
    let document = BoundDocument::parse(PAGE);
    std::thread::scope(|scope| {
        for selector in ["li", "nav a"] {
            let document = &document;
            scope.spawn(move || {
                let sieve = Sieve::with_document(document);
                let mut sheet = OwnedStylesheet::new(vec![
                    OwnedRule::new([selector], vec![OwnedDeclaration::new("color", "red")]).into(),
                ]);
                sieve.apply(&mut sheet).unwrap();
                assert_eq!(sheet.rules.len(), 1);
            });
        }
    });
}
