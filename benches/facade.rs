use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rand::{distributions::Alphanumeric, prelude::*};
use redload::{Client, MemoryStore, Redis, Report};

const ITER: usize = 1000;
const KEY_SIZE: usize = 32;
const VAL_SIZE: usize = 256;

fn rand_string(rng: &mut impl Rng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn rand_kv_pairs(n: usize) -> Vec<(String, String)> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| (rand_string(&mut rng, KEY_SIZE), rand_string(&mut rng, VAL_SIZE)))
        .collect()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

pub fn bench_set(c: &mut Criterion) {
    let kv_pairs = rand_kv_pairs(ITER);
    let nbytes: usize = kv_pairs.iter().map(|(k, v)| k.len() + v.len()).sum();
    let redis = Redis::new(|_: Report| {});

    let (kv_pairs, redis) = (&kv_pairs, &redis);

    let mut g = c.benchmark_group("facade_set");
    g.throughput(Throughput::Bytes(nbytes as u64));
    g.bench_function("memory", |b| {
        b.to_async(runtime()).iter_batched(
            || Client::with_store(MemoryStore::default()),
            |client| async move {
                for (k, v) in kv_pairs.iter() {
                    redis.set(&client, k, v, 0).await;
                }
            },
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

pub fn bench_get(c: &mut Criterion) {
    let kv_pairs = rand_kv_pairs(ITER);
    let nbytes: usize = kv_pairs.iter().map(|(k, v)| k.len() + v.len()).sum();
    let redis = Redis::new(|_: Report| {});
    let client = Client::with_store(MemoryStore::default());
    runtime().block_on(async {
        for (k, v) in kv_pairs.iter() {
            redis.set(&client, k, v, 0).await;
        }
    });

    let (kv_pairs, redis, client) = (&kv_pairs, &redis, &client);

    let mut g = c.benchmark_group("facade_get");
    g.throughput(Throughput::Bytes(nbytes as u64));
    g.bench_function("memory", |b| {
        b.to_async(runtime()).iter_batched(
            || {
                let mut keys: Vec<_> = kv_pairs.iter().map(|(k, _)| k.clone()).collect();
                keys.shuffle(&mut rand::thread_rng());
                keys
            },
            |keys| async move {
                for k in keys {
                    redis.get(client, &k).await;
                }
            },
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

pub fn bench_scan(c: &mut Criterion) {
    let redis = Redis::new(|_: Report| {});
    let client = Client::with_store(MemoryStore::default());
    runtime().block_on(async {
        for i in 0..ITER {
            redis.set(&client, &format!("user:{}", i), "x", 0).await;
            redis.set(&client, &format!("item:{}", i), "x", 0).await;
        }
    });

    let (redis, client) = (&redis, &client);

    c.bench_function("facade_scan_walk", |b| {
        b.to_async(runtime()).iter(|| async move {
            let mut cursor = 0;
            loop {
                let result = redis.scan(client, cursor, "user:*", 100).await;
                cursor = result.cursor;
                if cursor == 0 {
                    break;
                }
            }
        });
    });
}

criterion_group!(benches, bench_set, bench_get, bench_scan);
criterion_main!(benches);
