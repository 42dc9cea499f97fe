mod common;

use common::{complete_marked, create_test_backend, find, labels, text_edit};
use tower_lsp::lsp_types::*;

#[tokio::test]
async fn test_target_attributes_exclude_existing_ones() {
    let backend = create_test_backend();
    let list = complete_marked(
        &backend,
        "file:///work/app.csproj",
        "<Project>\n  <Target Name=\"Pack\" |>\n  </Target>\n</Project>",
    )
    .await
    .unwrap();
    let labels = labels(&list);
    assert!(labels.contains(&"DependsOnTargets"));
    assert!(labels.contains(&"Condition"));
    assert!(!labels.contains(&"Name"));

    let depends = find(&list, "DependsOnTargets");
    assert_eq!(text_edit(depends).new_text, "DependsOnTargets=\"$1\"$0");
    assert_eq!(depends.insert_text_format, Some(InsertTextFormat::SNIPPET));
}

#[tokio::test]
async fn test_partial_attribute_name_is_replaced() {
    let backend = create_test_backend();
    let list = complete_marked(
        &backend,
        "file:///work/app.csproj",
        "<Project>\n  <ItemGroup>\n    <PackageReference Incl| />\n  </ItemGroup>\n</Project>",
    )
    .await
    .unwrap();
    let edit = text_edit(find(&list, "Include"));
    assert_eq!(
        edit.range,
        Range::new(
            Position {
                line: 2,
                character: 22
            },
            Position {
                line: 2,
                character: 26
            }
        )
    );
}

#[tokio::test]
async fn test_attribute_name_itself_has_no_completions() {
    let backend = create_test_backend();
    let list = complete_marked(
        &backend,
        "file:///work/app.csproj",
        "<Project><Target Na|me=\"Build\" /></Project>",
    )
    .await;
    assert!(list.is_none());
}

#[tokio::test]
async fn test_completed_element_name_has_no_completions() {
    let backend = create_test_backend();
    let list = complete_marked(
        &backend,
        "file:///work/app.csproj",
        "<Project><Prop|ertyGroup></PropertyGroup></Project>",
    )
    .await;
    assert!(list.is_none());
}
