//! End-to-end ingest: redirect stream + link stream → LinkGraph.

use wikirank_core::graph::{BuildOptions, build_link_graph};
use wikirank_core::redirect::RedirectResolver;
use wikirank_core::triple::Namespace;

const REDIRECTS: &str = "\
<http://dbpedia.org/resource/A> <http://dbpedia.org/ontology/wikiPageRedirects> <http://dbpedia.org/resource/B> .
<http://dbpedia.org/resource/B> <http://dbpedia.org/ontology/wikiPageRedirects> <http://dbpedia.org/resource/C> .
";

const LINKS: &str = "\
# links dump
<http://dbpedia.org/resource/A> <http://dbpedia.org/ontology/wikiPageWikiLink> <http://dbpedia.org/resource/X> .
<http://dbpedia.org/resource/B> <http://dbpedia.org/ontology/wikiPageWikiLink> <http://dbpedia.org/resource/X> .
this line is not a triple
<http://dbpedia.org/resource/C> <http://dbpedia.org/ontology/wikiPageWikiLink> <http://dbpedia.org/resource/Y> .
";

fn quiet_options(limit: Option<usize>) -> BuildOptions {
    BuildOptions {
        limit,
        progress_interval: 0,
        ..BuildOptions::default()
    }
}

#[test]
fn redirect_chain_closes_and_collapses_links() {
    let resolver = RedirectResolver::new(Namespace::default()).with_progress_interval(0);
    let (redirects, redirect_stats) = resolver.resolve(REDIRECTS.as_bytes()).expect("redirects");
    assert_eq!(redirect_stats.triples, 2);
    assert_eq!(redirects.get("A"), Some("C"));
    assert_eq!(redirects.get("B"), Some("C"));
    assert_eq!(redirects.resolve("X"), "X");

    let graph = build_link_graph(LINKS.as_bytes(), &redirects, &quiet_options(None)).expect("links");

    assert_eq!(graph.index.names(), ["C", "X", "Y"]);
    assert_eq!(graph.edge_count(), 2, "A→X and B→X collapse onto one C→X cell");
    assert_eq!(graph.adjacency.get(0, 1), 1.0);
    assert_eq!(graph.adjacency.get(0, 2), 1.0);
    assert_eq!(graph.stats.edges_read, 3);
    assert_eq!(graph.stats.stream.malformed, 1);
    assert_eq!(graph.stats.stream.ignored, 1);
}

#[test]
fn identical_inputs_build_identical_graphs() {
    let resolver = RedirectResolver::new(Namespace::default()).with_progress_interval(0);
    let (redirects, _) = resolver.resolve(REDIRECTS.as_bytes()).expect("redirects");

    for limit in [None, Some(1), Some(2)] {
        let a = build_link_graph(LINKS.as_bytes(), &redirects, &quiet_options(limit)).expect("a");
        let b = build_link_graph(LINKS.as_bytes(), &redirects, &quiet_options(limit)).expect("b");
        assert_eq!(a, b);
    }
}

#[test]
fn foreign_namespace_uris_are_kept_whole() {
    let resolver = RedirectResolver::new(Namespace::default()).with_progress_interval(0);
    let (redirects, _) = resolver.resolve(&b""[..]).expect("empty redirects");
    let input = "<http://example.org/Z> <p> <http://dbpedia.org/resource/Q> .\n";
    let graph = build_link_graph(input.as_bytes(), &redirects, &quiet_options(None)).expect("build");
    assert_eq!(graph.index.names(), ["http://example.org/Z", "Q"]);
}

#[test]
fn graph_survives_json_round_trip() {
    let resolver = RedirectResolver::new(Namespace::default()).with_progress_interval(0);
    let (redirects, _) = resolver.resolve(REDIRECTS.as_bytes()).expect("redirects");
    let graph = build_link_graph(LINKS.as_bytes(), &redirects, &quiet_options(None)).expect("links");

    let json = serde_json::to_string(&graph).expect("serialize");
    let back: wikirank_core::graph::LinkGraph = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(graph, back);
}
