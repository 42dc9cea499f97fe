mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    MockRegistry, complete, complete_marked, completion_params, create_test_backend_with_registry,
    labels, open, split_marker, text_edit,
};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

const PACKAGES: &[&str] = &[
    "Newtonsoft.Json",
    "Newtonsoft.Json.Bson",
    "NUnit",
    "Microsoft.Extensions.Logging",
];

#[tokio::test]
async fn test_identifiers_are_prefix_filtered() {
    let registry = Arc::new(MockRegistry::new(PACKAGES, &[]));
    let backend = create_test_backend_with_registry(registry.clone());
    let list = complete_marked(
        &backend,
        "file:///work/app.csproj",
        "<Project><ItemGroup><PackageReference Include=\"newton|\" /></ItemGroup></Project>",
    )
    .await
    .unwrap();

    assert_eq!(labels(&list), vec!["Newtonsoft.Json", "Newtonsoft.Json.Bson"]);
    // The registry returned non-matching names, so more may exist.
    assert!(list.is_incomplete);
    assert_eq!(registry.calls(), 1);

    // The whole attribute value is replaced.
    let edit = text_edit(&list.items[0]);
    assert_eq!(edit.range.start.character, 47);
    assert_eq!(edit.range.end.character, 53);
}

#[tokio::test]
async fn test_unfiltered_short_page_is_exhaustive() {
    let registry = Arc::new(MockRegistry::new(&["NUnit", "NUnit3TestAdapter"], &[]));
    let backend = create_test_backend_with_registry(registry);
    let list = complete_marked(
        &backend,
        "file:///work/app.csproj",
        "<Project><ItemGroup><PackageReference Include=\"NU|\" /></ItemGroup></Project>",
    )
    .await
    .unwrap();
    assert_eq!(labels(&list), vec!["NUnit", "NUnit3TestAdapter"]);
    assert!(!list.is_incomplete);
}

#[tokio::test]
async fn test_versions_are_exact_prefix_matches_newest_first() {
    let registry = Arc::new(MockRegistry::new(
        &[],
        &["12.0.3", "13.0.1", "13.0.2", "13.0.3"],
    ));
    let backend = create_test_backend_with_registry(registry);
    let list = complete_marked(
        &backend,
        "file:///work/app.csproj",
        "<Project><ItemGroup><PackageReference Include=\"Newtonsoft.Json\" Version=\"13|\" /></ItemGroup></Project>",
    )
    .await
    .unwrap();
    assert_eq!(labels(&list), vec!["13.0.3", "13.0.2", "13.0.1"]);
    assert!(list.is_incomplete);
    assert_eq!(list.items[0].kind, Some(CompletionItemKind::VALUE));
}

#[tokio::test]
async fn test_unterminated_value_still_completes() {
    let registry = Arc::new(MockRegistry::new(PACKAGES, &[]));
    let backend = create_test_backend_with_registry(registry);
    let list = complete_marked(
        &backend,
        "file:///work/app.csproj",
        "<Project>\n  <ItemGroup>\n    <PackageReference Include=\"NU|\n  </ItemGroup>\n</Project>",
    )
    .await
    .unwrap();
    assert_eq!(labels(&list), vec!["NUnit"]);
}

#[tokio::test]
async fn test_registry_failure_yields_no_completions() {
    let mut registry = MockRegistry::new(PACKAGES, &[]);
    registry.fail = true;
    let backend = create_test_backend_with_registry(Arc::new(registry));
    let list = complete_marked(
        &backend,
        "file:///work/app.csproj",
        "<Project><ItemGroup><PackageReference Include=\"N|\" /></ItemGroup></Project>",
    )
    .await;
    assert!(list.is_none());
}

#[tokio::test]
async fn test_registry_is_not_queried_elsewhere() {
    let registry = Arc::new(MockRegistry::new(PACKAGES, &[]));
    let backend = create_test_backend_with_registry(registry.clone());
    complete_marked(
        &backend,
        "file:///work/app.csproj",
        "<Project><ItemGroup><Compile Include=\"N|\" /></ItemGroup></Project>",
    )
    .await;
    complete_marked(
        &backend,
        "file:///work/b.csproj",
        "<Project><PropertyGroup>|</PropertyGroup></Project>",
    )
    .await;
    assert_eq!(registry.calls(), 0);
}

#[tokio::test]
async fn test_dropped_request_stops_waiting_for_registry() {
    let mut registry = MockRegistry::new(PACKAGES, &[]);
    registry.delay = Some(Duration::from_secs(30));
    let backend = create_test_backend_with_registry(Arc::new(registry));
    let uri = Url::parse("file:///work/app.csproj").unwrap();
    let (text, position) = split_marker(
        "<Project><ItemGroup><PackageReference Include=\"N|\" /></ItemGroup></Project>",
    );
    open(&backend, &uri, &text).await;

    // The transport cancels a request by dropping its future.
    let request = backend.completion(completion_params(&uri, position));
    let timed_out = tokio::time::timeout(Duration::from_millis(50), request).await;
    assert!(timed_out.is_err());

    // The document lock was released: an edit and a new request proceed.
    backend
        .did_change(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.clone(),
                version: 2,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: "<Project><PropertyGroup></PropertyGroup></Project>".to_string(),
            }],
        })
        .await;
    let (_, position) = split_marker("<Project><PropertyGroup>|");
    assert!(complete(&backend, &uri, position).await.is_some());
}

#[tokio::test]
async fn test_full_page_is_incomplete_even_when_everything_matches() {
    let page_size = msbuild_lsp::config::RegistryConfig::default().page_size;
    let names: Vec<String> = (0..page_size).map(|i| format!("Serilog.Sinks.S{i:02}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let registry = Arc::new(MockRegistry::new(&refs, &[]));
    let backend = create_test_backend_with_registry(registry);
    let list = complete_marked(
        &backend,
        "file:///work/app.csproj",
        "<Project><ItemGroup><PackageReference Include=\"Serilog|\" /></ItemGroup></Project>",
    )
    .await
    .unwrap();
    assert_eq!(list.items.len(), page_size);
    // Nothing was filtered out, but the registry may hold more.
    assert!(list.is_incomplete);
}
