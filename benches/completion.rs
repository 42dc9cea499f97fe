use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tokio_util::sync::CancellationToken;

use msbuild_lsp::completion::engine::CompletionEngine;
use msbuild_lsp::config::Config;
use msbuild_lsp::document::DocumentModel;
use msbuild_lsp::evaluation::XmlProjectEvaluator;
use msbuild_lsp::location::resolve;
use msbuild_lsp::reference::ReferenceData;

const CARET: &str = "<|>";

/// A project with `groups` property and item groups and the same number
/// of targets, with the caret placed in the last property group.
fn large_project(groups: usize) -> String {
    let mut text = String::from("<Project Sdk=\"Microsoft.NET.Sdk\">\n");
    for i in 0..groups {
        text.push_str("  <PropertyGroup>\n");
        text.push_str(&format!("    <Custom{i}>value {i}</Custom{i}>\n"));
        text.push_str("    <TargetFramework>net8.0</TargetFramework>\n");
        text.push_str("  </PropertyGroup>\n");
        text.push_str("  <ItemGroup>\n");
        text.push_str(&format!("    <Compile Include=\"src/File{i}.cs\" />\n"));
        text.push_str(&format!("    <Generated{i} Include=\"gen/{i}.txt\" />\n"));
        text.push_str("  </ItemGroup>\n");
        text.push_str(&format!(
            "  <Target Name=\"Step{i}\" DependsOnTargets=\"Step0\">\n    <Message Text=\"{i}\" />\n  </Target>\n"
        ));
    }
    text.push_str("  <PropertyGroup>\n    <|>\n  </PropertyGroup>\n");
    text.push_str("  <Target Name=\"Last\" DependsOnTargets=\"<|>\" />\n");
    text.push_str("</Project>\n");
    text
}

/// Strip every caret and return the byte offsets they marked.
fn strip_carets(marked: &str) -> (String, Vec<usize>) {
    let mut text = String::with_capacity(marked.len());
    let mut offsets = Vec::new();
    let mut rest = marked;
    while let Some(at) = rest.find(CARET) {
        text.push_str(&rest[..at]);
        offsets.push(text.len());
        rest = &rest[at + CARET.len()..];
    }
    text.push_str(rest);
    (text, offsets)
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_project");
    group.measurement_time(Duration::from_secs(2));
    group.warm_up_time(Duration::from_secs(1));
    group.sample_size(20);

    for groups in [10, 100, 500] {
        let (text, _) = strip_carets(&large_project(groups));
        group.bench_with_input(BenchmarkId::from_parameter(groups), &text, |b, text| {
            b.iter(|| black_box(msbuild_lsp::parser::parse(black_box(text))))
        });
    }

    group.finish();
}

fn bench_completions(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let mut config = Config::default();
    config.registry.enabled = false;
    let engine = CompletionEngine::standard(&config, Arc::new(ReferenceData::builtin()), None);

    let (text, offsets) = strip_carets(&large_project(200));
    let model = DocumentModel::new(
        "untitled:bench.csproj",
        text.clone(),
        1,
        Arc::new(XmlProjectEvaluator),
    );

    let mut group = c.benchmark_group("complete_at");
    group.measurement_time(Duration::from_secs(2));
    group.warm_up_time(Duration::from_secs(1));
    group.sample_size(20);

    for (id, offset) in [("property_slot", offsets[0]), ("target_list", offsets[1])] {
        group.bench_function(id, |b| {
            b.to_async(&runtime).iter(|| async {
                let cancel = CancellationToken::new();
                let document = model.read().await;
                let location = resolve(document.tree(), document.text(), black_box(offset))?;
                let set = engine.complete_at(&location, &document, &cancel).await?;
                Some(black_box(set.items.len()))
            })
        });
    }

    // Outside the timed loops: both carets produce completions.
    let sanity = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let document = model.read().await;
        let mut counts = Vec::new();
        for offset in &offsets {
            let location = resolve(document.tree(), document.text(), *offset);
            let count = match location {
                Some(location) => engine
                    .complete_at(&location, &document, &cancel)
                    .await
                    .map_or(0, |set| set.items.len()),
                None => 0,
            };
            counts.push(count);
        }
        counts
    });
    black_box(sanity);

    group.finish();
}

criterion_group!(benches, bench_parse, bench_completions);
criterion_main!(benches);
