use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use specmill_core::{
    AppObject, Document, Fragment, FragmentMap, HookContext, Plugin, PluginError,
};

/// A named model pointing to the next one in a chain.
#[derive(Debug)]
struct Link {
    name: String,
    next: Option<AppObject>,
}

#[derive(Debug)]
struct Links;

impl Plugin for Links {
    fn object_name(
        &mut self,
        _ctx: &HookContext<'_>,
        object: &AppObject,
    ) -> Result<Option<String>, PluginError> {
        Ok(object.downcast_ref::<Link>().map(|link| link.name.clone()))
    }

    fn convert_object(
        &mut self,
        _ctx: &HookContext<'_>,
        object: &AppObject,
    ) -> Result<Option<Fragment>, PluginError> {
        Ok(object.downcast_ref::<Link>().map(|link| {
            let mut schema = Fragment::map().with("type", "object");
            if let Some(next) = &link.next {
                schema.insert("properties", Fragment::map().with("next", next.clone()));
            }
            schema
        }))
    }
}

fn wide(width: usize) -> Fragment {
    let properties = (0..width)
        .map(|index| (format!("field_{index}"), Fragment::schema_ref(format!("Model{index}"))))
        .collect::<FragmentMap>();
    Fragment::map()
        .with("type", "object")
        .with("properties", properties)
}

fn deep(depth: usize) -> Fragment {
    (0..depth).fold(Fragment::from("leaf"), |inner, _| {
        Fragment::map().with("items", vec![inner])
    })
}

fn chain(length: usize) -> AppObject {
    (0..length).fold(None, |next, index| {
        Some(AppObject::new(Link {
            name: format!("Link{index}"),
            next,
        }))
    })
    .unwrap_or_else(|| AppObject::new(()))
}

fn document() -> Document {
    match Document::builder().with_plugin(Links).build() {
        Ok(doc) => doc,
        Err(error) => panic!("fail to build document: {error}"),
    }
}

fn benchmark_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for size in [10, 100, 1_000] {
        group.bench_with_input(BenchmarkId::new("wide", size), &size, |b, &size| {
            let mut doc = document();
            b.iter(|| black_box(doc.resolve(black_box(wide(size)))));
        });

        group.bench_with_input(BenchmarkId::new("deep", size), &size, |b, &size| {
            let mut doc = document();
            b.iter(|| black_box(doc.resolve(black_box(deep(size)))));
        });

        group.bench_with_input(BenchmarkId::new("object_chain", size), &size, |b, &size| {
            b.iter(|| {
                let mut doc = document();
                black_box(doc.resolve(chain(size)))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_resolution);
criterion_main!(benches);
