/// Completion-related modules.
///
/// - **provider**: The `CompletionProvider` capability every source of
///   completions implements
/// - **engine**: Fan-out to all providers, merge, de-duplicate and sort
/// - **handler**: The LSP request entry point
/// - **properties**, **items**, **elements**, **attributes**, **targets**,
///   **packages**: The concrete providers
pub mod attributes;
pub mod elements;
pub mod engine;
pub(crate) mod handler;
pub mod items;
pub mod packages;
pub mod properties;
pub mod provider;
pub mod targets;
