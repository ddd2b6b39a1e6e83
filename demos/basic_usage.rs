// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic view-sync usage example.
//!
//! Demonstrates:
//! 1. Declaring views per document type and standalone
//! 2. Opening a request scope (auto-sync creates the collection + design docs)
//! 3. Re-syncing (no writes the second time)
//! 4. Paging forward and back through a view with duplicate keys
//! 5. Displaying metrics
//!
//! Runs entirely in memory; swap `InMemoryStore` for `CouchConnector` to talk
//! to a real server.
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::watch;
use view_sync::{
    paginate, ConnectionScope, Cursor, DocumentRows, DocumentViews, InMemoryStore, Row, SyncManager,
    ViewDefinition, ViewRegistry, ViewSyncConfig,
};

struct Restaurant;

impl DocumentViews for Restaurant {
    const DOC_TYPE: &'static str = "restaurant";

    fn view_definitions() -> Vec<Arc<ViewDefinition>> {
        vec![by_cuisine()]
    }
}

fn by_cuisine() -> Arc<ViewDefinition> {
    ViewDefinition::new(
        "restaurants",
        "by_cuisine",
        "function(doc) { if (doc.doc_type == 'restaurant') emit(doc.cuisine, null); }",
    )
    .default_include_docs(true)
    .shared()
}

#[derive(Debug, Deserialize)]
struct RestaurantDoc {
    name: String,
    cuisine: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║             view-sync: Basic Usage Example                    ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Declare views
    // ─────────────────────────────────────────────────────────────────────────
    println!("📦 Registering views...");

    let registry = ViewRegistry::new();
    registry.add_document::<Restaurant>()?;
    registry.add_view(ViewDefinition::new("stats", "all_ids", "function(doc) { emit(doc._id, null); }").shared())?;
    for (design, defs) in registry.all_definitions() {
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        println!("   └─ _design/{} → {:?}", design, names);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Open a request scope
    // ─────────────────────────────────────────────────────────────────────────
    let config = ViewSyncConfig::default();
    let store = InMemoryStore::new(config.database.clone());
    let manager = Arc::new(SyncManager::from_config(Arc::new(registry), &config));
    let (config_tx, config_rx) = watch::channel(config);
    let scope = ConnectionScope::new(manager.clone(), Arc::new(store.clone()), config_rx);

    println!("\n🚀 Opening request scope (auto-sync on)...");
    let handle = scope.begin().await?;
    println!("   ✅ Handle {} synced={} design writes={}", handle.id(), handle.synced(), store.design_writes());

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Sync again: nothing to write
    // ─────────────────────────────────────────────────────────────────────────
    let report = manager.sync(&*handle).await?;
    println!("\n🔁 Second sync: {:?}", report);
    scope.end(handle);

    // Runtime switch: later requests skip the sync
    config_tx.send_modify(|c| c.disable_auto_sync = true);

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Page through the view
    // ─────────────────────────────────────────────────────────────────────────
    let cuisines = ["french", "italian", "thai"];
    let rows = (0..10).map(|i| {
        let cuisine = cuisines[i % cuisines.len()];
        Row::new(cuisine, format!("r{:02}", i), json!(null))
            .with_doc(json!({"name": format!("Restaurant {}", i), "cuisine": cuisine}))
    });
    store.index_rows("restaurants", "by_cuisine", rows)?;

    let handle = scope.begin().await?;
    let query = by_cuisine().query();
    let wrapper = DocumentRows::<RestaurantDoc>::new();

    println!("\n📖 Paging forward (4 per page)...");
    let mut start: Option<String> = None;
    let mut last_prev: Option<Cursor> = None;
    loop {
        let page = paginate(&*handle, &query, 4, start.as_deref(), &wrapper).await?;
        let names: Vec<String> = page.items.iter().map(|r| format!("{} ({})", r.name, r.cuisine)).collect();
        println!("   └─ {:?}", names);
        println!("      next={} prev={}", display(&page.next), display(&page.prev));
        last_prev = page.prev.clone();
        start = page.next.as_ref().map(Cursor::encode);
        if start.is_none() {
            break;
        }
    }

    if let Some(prev) = last_prev {
        println!("\n⏪ Following prev from the last page...");
        let page = paginate(&*handle, &query, 4, Some(&prev.encode()), &wrapper).await?;
        let names: Vec<&str> = page.items.iter().map(|r| r.name.as_str()).collect();
        println!("   └─ {:?}", names);
    }

    println!("\n🚫 Malformed cursor:");
    match paginate(&*handle, &query, 4, Some("not-a-cursor"), &wrapper).await {
        Ok(_) => println!("   └─ unexpectedly accepted"),
        Err(e) => println!("   └─ {} (client error: {})", e, e.is_client_error()),
    }
    scope.end(handle);

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Dump metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Metrics:");
    dump_metrics(&snapshotter);

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Example complete!                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

fn display(cursor: &Option<Cursor>) -> String {
    cursor.as_ref().map(Cursor::encode).unwrap_or_else(|| "-".into())
}

/// Dump all captured metrics grouped by kind
fn dump_metrics(snapshotter: &Snapshotter) {
    let mut counters = Vec::new();
    let mut gauges = Vec::new();
    let mut histograms = Vec::new();

    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let (_, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };
        let name = format!("{}{}", key.name(), label_str);

        match value {
            DebugValue::Counter(v) => counters.push((name, v)),
            DebugValue::Gauge(v) => gauges.push((name, v.into_inner())),
            DebugValue::Histogram(samples) => {
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                histograms.push((name, samples.len(), sum));
            }
        }
    }

    counters.sort();
    gauges.sort_by(|a, b| a.0.cmp(&b.0));
    histograms.sort_by(|a, b| a.0.cmp(&b.0));

    println!("   ┌─ Counters");
    for (name, value) in &counters {
        println!("   │  └─ {} = {}", name, value);
    }
    println!("   ├─ Gauges");
    for (name, value) in &gauges {
        println!("   │  └─ {} = {:.2}", name, value);
    }
    println!("   └─ Histograms");
    for (name, count, sum) in &histograms {
        println!("      └─ {} count={} sum={:.6}", name, count, sum);
    }
}
