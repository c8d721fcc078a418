extern crate criterion;

use criterion::{criterion_group, criterion_main, Criterion};

use css_sieve_lib::parser::html::create_dom_tree;
use css_sieve_lib::{parse_stylesheet, BoundDocument, Sieve};

fn large_document() -> String {
    let mut big_html = String::with_capacity(4_000_000);
    big_html.push_str("<div id='root'>");
    for i in 0..100_000 {
        big_html.push_str(&format!("<p class='item item-{}'>Test</p>", i % 100));
    }
    big_html.push_str("</div>");
    big_html
}

fn large_stylesheet() -> String {
    let mut css = String::new();
    for i in 0..200 {
        css.push_str(&format!(".item-{} {{ color: red }}\n", i));
        css.push_str(&format!("#root > p.item-{}:nth-child(odd)::before {{ content: 'x' }}\n", i));
        css.push_str(&format!("@media (min-width: {}px) {{ div p.item-{} {{ margin: 0 }} }}\n", i, i));
    }
    css
}

fn bench_large_document(c: &mut Criterion) {
    let big_html = large_document();

    c.bench_function("large_document", |b| b.iter(|| create_dom_tree(&big_html)));
    c.bench_function("bind_large_document", |b| b.iter(|| BoundDocument::parse(&big_html)));
}

fn bench_deep_nesting(c: &mut Criterion) {
    let mut deep_html = String::new();
    for _ in 0..1000 {
        deep_html.push_str("<div>");
    }
    deep_html.push_str("<span>Content</span>");
    for _ in 0..1000 {
        deep_html.push_str("</div>");
    }
    let document = BoundDocument::parse(&deep_html);
    let sheet = parse_stylesheet("div div span { color: red } div > p span { color: blue }").unwrap();

    c.bench_function("deep_nesting_descendant_match", |b| {
        let sieve = Sieve::with_document(&document);
        b.iter(|| {
            let mut sheet = sheet.clone();
            sieve.apply(&mut sheet).unwrap()
        })
    });
}

fn bench_sieve(c: &mut Criterion) {
    let document = BoundDocument::parse(&large_document());
    let sheet = parse_stylesheet(&large_stylesheet()).unwrap();

    c.bench_function("sieve_large_stylesheet", |b| {
        let sieve = Sieve::with_document(&document);
        b.iter(|| {
            let mut sheet = sheet.clone();
            sieve.apply(&mut sheet).unwrap()
        })
    });
}

criterion_group!(benches, bench_large_document, bench_deep_nesting, bench_sieve);
criterion_main!(benches);
