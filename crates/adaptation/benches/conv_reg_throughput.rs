use adaptation::{AdaptationModule, AdaptationRegistry, ModuleArgs};
use candle_core::{DType, Device, Tensor};
use candle_nn::{ModuleT, VarBuilder, VarMap};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn bench_conv_reg(c: &mut Criterion) {
    let device = Device::Cpu;
    let registry = AdaptationRegistry::with_builtin_modules();
    let batch = 8usize;
    // (student channels, teacher channels, spatial size)
    let shapes = &[(64usize, 128usize, 28usize), (128, 256, 14), (256, 512, 7)];

    let mut group = c.benchmark_group("conv_reg");
    for &(in_channels, out_channels, spatial) in shapes {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let args = ModuleArgs::positional([in_channels, out_channels, 3, 1, 1]);
        let module = registry
            .get_adaptation_module("ConvReg", &args, vb)
            .expect("construct")
            .expect("registered");
        let input = Tensor::randn(0f32, 1.0, (batch, in_channels, spatial, spatial), &device)
            .expect("input");

        let elements = (batch * out_channels * spatial * spatial) as u64;
        group.throughput(Throughput::Elements(elements));
        let id = format!("{in_channels}x{spatial}->{out_channels}");

        group.bench_with_input(BenchmarkId::new("eval", &id), &input, |b, input| {
            b.iter(|| {
                let out = module.forward(black_box(input)).expect("forward");
                black_box(out);
            });
        });

        group.bench_with_input(BenchmarkId::new("train", &id), &input, |b, input| {
            b.iter(|| {
                let out = module.forward_t(black_box(input), true).expect("forward");
                black_box(out);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_conv_reg);
criterion_main!(benches);
