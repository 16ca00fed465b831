use criterion::{black_box, criterion_group, criterion_main, Criterion};
use seg2annot::{annotation_codes, AnnotatedSurface, BrainMesh, FsColortable, FsSurface};

// Vertex count of the lh.white of a typical subject.
const NUM_VERTICES: usize = 149244;

fn demo_colortable() -> FsColortable {
    let mut ct = FsColortable::new("bench.ctab");
    for idx in 0..36 {
        ct.push_entry(idx, format!("region{}", idx), [idx * 7, 255 - idx * 7, idx, 0]).unwrap();
    }
    ct
}

fn demo_segmentation() -> Vec<i32> {
    (0..NUM_VERTICES).map(|v| (v % 40) as i32).collect()
}

fn demo_surface() -> FsSurface {
    FsSurface::from_mesh(BrainMesh {
        vertices: vec![0.0; NUM_VERTICES * 3],
        faces: Vec::new(),
    })
}

fn bench_seg2annot(c: &mut Criterion) {
    let ct = demo_colortable();
    let segmentation = demo_segmentation();

    c.bench_function("annotation_codes", |b| {
        b.iter(|| annotation_codes(black_box(&segmentation), &ct))
    });
    c.bench_function("write_annot", |b| {
        let mut annotated = AnnotatedSurface::new(demo_surface(), &ct);
        annotated.assign(&segmentation).unwrap();
        let annot = annotated.to_annot();
        b.iter(|| {
            let mut buf: Vec<u8> = Vec::with_capacity(NUM_VERTICES * 8 + 4096);
            annot.write_to(black_box(&mut buf)).unwrap();
            buf
        })
    });
}

criterion_group!(benches, bench_seg2annot);
criterion_main!(benches);
