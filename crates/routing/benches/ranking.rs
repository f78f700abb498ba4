use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use forgeroute_core::{Coordinates, ProductId, SellerId};
use forgeroute_inventory::{InMemoryInventoryLedger, InventoryLedger, SkuKey, StockLine};
use forgeroute_routing::{rank_candidates, Seller};

/// Sellers spread over a grid around Guangzhou, every one stocking every product.
fn setup(seller_count: usize, products: &[ProductId]) -> (Vec<Seller>, InMemoryInventoryLedger) {
    let ledger = InMemoryInventoryLedger::new();
    let sellers: Vec<Seller> = (0..seller_count)
        .map(|i| {
            let lat = 22.0 + (i % 50) as f64 * 0.05;
            let lon = 112.0 + (i / 50) as f64 * 0.05;
            let seller = Seller {
                id: SellerId::new(),
                business_name: format!("seller-{i}"),
                active: true,
                auto_accept: false,
                coordinates: Coordinates::new(lat, lon).ok(),
            };
            for (p, product) in products.iter().enumerate() {
                // A third of sellers lack the first product, exercising the AND filter.
                let stock = if p == 0 && i % 3 == 0 { 0 } else { 10 };
                ledger
                    .set_on_hand(seller.id, SkuKey::new(*product, None), stock)
                    .expect("seed stock");
            }
            seller
        })
        .collect();
    (sellers, ledger)
}

fn bench_rank_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_candidates");
    let products: Vec<ProductId> = (0..3).map(|_| ProductId::new()).collect();
    let lines: Vec<StockLine> = products.iter().map(|p| StockLine::new(*p, None, 2)).collect();
    let destination = Coordinates::new(23.1291, 113.2644).ok();

    for seller_count in [100usize, 500, 1_000] {
        let (sellers, ledger) = setup(seller_count, &products);
        group.throughput(Throughput::Elements(seller_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(seller_count), &seller_count, |b, _| {
            b.iter(|| {
                let ranked = rank_candidates(destination.as_ref(), &sellers, &lines, &ledger)
                    .expect("ranking succeeds");
                black_box(ranked.len())
            })
        });
    }
    group.finish();
}

fn bench_reserve_release(c: &mut Criterion) {
    let product = ProductId::new();
    let (sellers, ledger) = setup(1, &[product]);
    let seller = sellers[0].id;
    ledger
        .set_on_hand(seller, SkuKey::new(product, None), 10)
        .expect("seed stock");
    let lines = [StockLine::new(product, None, 1)];

    c.bench_function("reserve_then_release", |b| {
        b.iter(|| {
            ledger.reserve(black_box(seller), &lines).expect("reserve");
            ledger.release(seller, &lines).expect("release");
        })
    });
}

criterion_group!(benches, bench_rank_candidates, bench_reserve_release);
criterion_main!(benches);
