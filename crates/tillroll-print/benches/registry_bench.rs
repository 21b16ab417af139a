// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the printer registry merge and receipt layout.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tillroll_core::receipt::Receipt;
use tillroll_core::types::PrinterDescriptor;
use tillroll_print::{ReceiptLayout, merge};

/// A busy venue: a handful of configured printers plus many scan results,
/// some of which repeat with different casing.
fn scan_results(count: usize) -> Vec<PrinterDescriptor> {
    (0..count)
        .map(|i| {
            let target = if i % 5 == 0 {
                format!("bt:00:11:22:33:44:{:02x}", i % 64)
            } else {
                format!("192.168.{}.{}", i / 250, i % 250)
            };
            PrinterDescriptor::new(format!("Printer {i}"), target)
        })
        .collect()
}

fn synthetic(count: usize) -> Vec<PrinterDescriptor> {
    (0..count)
        .map(|i| {
            PrinterDescriptor::new(
                format!("Counter {i}"),
                format!("BT:00:11:22:33:44:{:02X}", i * 5),
            )
            .with_pin("1234")
            .synthetic()
        })
        .collect()
}

fn bench_merge(c: &mut Criterion) {
    let synthetic = synthetic(8);
    let small = scan_results(20);
    let large = scan_results(500);

    c.bench_function("merge_20_discovered", |b| {
        b.iter(|| merge(black_box(&small), black_box(&synthetic)));
    });
    c.bench_function("merge_500_discovered", |b| {
        b.iter(|| merge(black_box(&large), black_box(&synthetic)));
    });
}

fn bench_layout(c: &mut Criterion) {
    let layout = ReceiptLayout::default();
    let receipt = Receipt::sample("My Store");

    c.bench_function("render_sample_receipt", |b| {
        b.iter(|| layout.render(black_box(&receipt)));
    });
}

criterion_group!(benches, bench_merge, bench_layout);
criterion_main!(benches);
