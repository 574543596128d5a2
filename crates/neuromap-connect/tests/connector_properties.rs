use ndarray::{Array1, Array2};
use neuromap_connect::{
    probable_maximum_selected, Connector, DelayWindow, DistanceDependentProbabilityConnector, Expression,
    FixedAtomsPartitioner, ParameterSource, Population, PopulationId, Projection, ProjectionId,
    ProjectionRng, RandomDistribution, Slice, SlicePartitioner, Structure, DEFAULT_CHANCE,
};
use proptest::prelude::*;

fn line(id: u32, size: usize) -> Population {
    Population::new(PopulationId::new(id), format!("line{}", id), size)
        .unwrap()
        .with_structure(Structure::line())
}

fn configured(expr: &str, allow_self: bool, pop: &Population, seed: u64) -> DistanceDependentProbabilityConnector {
    let mut conn = DistanceDependentProbabilityConnector::new(expr, allow_self, None)
        .unwrap()
        .with_weights(ParameterSource::Random(RandomDistribution::Normal { mu: 1.0, sigma: 0.2 }))
        .with_delays(ParameterSource::Random(RandomDistribution::Uniform { low: 1.0, high: 8.0 }))
        .with_chance(1e-6)
        .unwrap();
    conn.set_projection_information(pop, pop, ProjectionRng::new(seed), 1000)
        .unwrap();
    conn
}

fn arb_delays(size: usize) -> impl Strategy<Value = ParameterSource> {
    prop_oneof![
        (0.2f64..12.0).prop_map(ParameterSource::Fixed),
        prop::collection::vec(0.2f64..12.0, size * size)
            .prop_map(move |v| ParameterSource::PerPair(Array2::from_shape_vec((size, size), v).unwrap())),
        (0.2f64..6.0, 0.5f64..8.0)
            .prop_map(|(low, width)| ParameterSource::Random(RandomDistribution::Uniform { low, high: low + width })),
    ]
}

fn arb_expression() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("exp(-d)"),
        Just("exp(-d * d / 8)"),
        Just("0.5"),
        Just("d < 3"),
        Just("1 / (1 + d)"),
        Just("(d > 1) & (d < 4)"),
        Just("maximum(0, 1 - d / 5)"),
    ]
}

#[test]
fn four_by_four_all_to_all_without_self() {
    let pop = line(0, 4);
    let mut conn = DistanceDependentProbabilityConnector::new("1", false, None).unwrap();
    conn.set_projection_information(&pop, &pop, ProjectionRng::new(0), 1000)
        .unwrap();
    let slices = [Slice::whole(4)];
    let records = conn.create_synaptic_block(&slices, 0, &slices, 0, 0).unwrap();

    let mut pairs: Vec<_> = records.iter().map(|r| (r.source.raw(), r.target.raw())).collect();
    pairs.sort();
    let expected: Vec<_> = (0..4u32)
        .flat_map(|s| (0..4u32).map(move |t| (s, t)))
        .filter(|(s, t)| s != t)
        .collect();
    assert_eq!(pairs, expected);
}

#[test]
fn zero_expression_gives_nothing() {
    let pop = line(0, 10);
    let conn = configured("0", false, &pop, 3);
    let mut projection = Projection::new(ProjectionId::new(0), &pop, &pop, conn, 0, 3, 1000).unwrap();
    let plan = projection.plan(&FixedAtomsPartitioner::new(4).unwrap()).unwrap();
    assert!(projection.generate(&plan).unwrap().iter().all(|b| b.is_empty()));
    assert_eq!(projection.connector().get_n_connections_maximum().unwrap(), 0);
    assert_eq!(projection.connector().get_weight_maximum().unwrap(), 0.0);
}

#[test]
fn expression_rejections_are_configuration_errors() {
    for source in ["", "exp(", "d +", "import(d)", "__class__", "exp(d, d)", "d ^ 2", "x * 2"] {
        let err = Expression::parse(source).unwrap_err();
        assert!(err.is_configuration(), "{:?} should be a configuration error", source);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn evaluation_preserves_shape(values in prop::collection::vec(0.0f64..100.0, 1..64), cols in 1usize..8) {
        let expr = Expression::parse("exp(-d / 10) * (d < 50)").unwrap();
        let n = values.len();
        let flat = Array1::from(values.clone());
        let evaluated = expr.evaluate(flat.view()).unwrap();
        prop_assert_eq!(evaluated.shape(), &[n]);

        let grid = Array2::from_shape_fn((n, cols), |(i, j)| values[i] + j as f64);
        let out = expr.evaluate(grid.view()).unwrap();
        prop_assert_eq!(out.dim(), (n, cols));
        prop_assert!(out.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn bound_is_monotonic_in_probability(n in 1u64..500, a in 0.0f64..1.0, b in 0.0f64..1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let k_lo = probable_maximum_selected(n * n, n, lo, DEFAULT_CHANCE).unwrap();
        let k_hi = probable_maximum_selected(n * n, n, hi, DEFAULT_CHANCE).unwrap();
        prop_assert!(k_lo <= k_hi);
        prop_assert!(k_hi as u64 <= n);
    }

    #[test]
    fn no_self_connections_when_suppressed(expr in arb_expression(), size in 2usize..24, seed in any::<u64>()) {
        let pop = line(0, size);
        let mut conn = configured(expr, false, &pop, seed);
        let slices = FixedAtomsPartitioner::new(5).unwrap().partition(&pop).unwrap();
        for i in 0..slices.len() {
            for j in 0..slices.len() {
                let records = conn.create_synaptic_block(&slices, i, &slices, j, 0).unwrap();
                prop_assert!(records.iter().all(|r| r.source != r.target));
                prop_assert!(records.iter().all(|r| slices[i].contains(r.source.index())));
                prop_assert!(records.iter().all(|r| slices[j].contains(r.target.index())));
            }
        }
    }

    #[test]
    fn bounds_cover_observed_counts(expr in arb_expression(), size in 1usize..30, seed in any::<u64>()) {
        let pop = line(0, size);
        let mut conn = configured(expr, true, &pop, seed);
        let slices = FixedAtomsPartitioner::new(7).unwrap().partition(&pop).unwrap();
        let max_total = conn.get_n_connections_maximum().unwrap();
        let max_in = conn.get_n_connections_to_post_vertex_maximum().unwrap();
        let max_delay = conn.get_delay_maximum().unwrap();

        let mut total = 0u32;
        let mut into = vec![0u32; size];
        for i in 0..slices.len() {
            for j in 0..slices.len() {
                let max_out = conn.get_n_connections_from_pre_vertex_maximum(&slices[j], None).unwrap();
                let records = conn.create_synaptic_block(&slices, i, &slices, j, 0).unwrap();
                let mut out = vec![0u32; size];
                for r in &records {
                    out[r.source.index()] += 1;
                    into[r.target.index()] += 1;
                    prop_assert!(r.delay as u32 <= max_delay.max(1));
                }
                prop_assert!(out.iter().all(|&c| c <= max_out));
                total += records.len() as u32;
            }
        }
        prop_assert!(total <= max_total);
        prop_assert!(into.iter().all(|&c| c <= max_in));
    }

    #[test]
    fn delay_window_bounds_cover_observed_counts(
        expr in arb_expression(),
        (size, delays) in (1usize..24).prop_flat_map(|n| (Just(n), arb_delays(n))),
        seed in any::<u64>(),
    ) {
        let pop = line(0, size);
        let mut conn = DistanceDependentProbabilityConnector::new(expr, true, None)
            .unwrap()
            .with_delays(delays)
            .with_chance(1e-6)
            .unwrap();
        conn.set_projection_information(&pop, &pop, ProjectionRng::new(seed), 1000)
            .unwrap();
        let slices = FixedAtomsPartitioner::new(6).unwrap().partition(&pop).unwrap();
        let windows: Vec<DelayWindow> = [(1, 1), (1, 3), (2, 4), (5, 12), (1, 144)]
            .iter()
            .map(|&(lo, hi)| DelayWindow::new(lo, hi).unwrap())
            .collect();

        for j in 0..slices.len() {
            let unwindowed = conn.get_n_connections_from_pre_vertex_maximum(&slices[j], None).unwrap();
            let bounds: Vec<u32> = windows
                .iter()
                .map(|&w| conn.get_n_connections_from_pre_vertex_maximum(&slices[j], Some(w)).unwrap())
                .collect();
            prop_assert!(bounds.iter().all(|&b| b <= unwindowed));

            for i in 0..slices.len() {
                let records = conn.create_synaptic_block(&slices, i, &slices, j, 0).unwrap();
                for (window, &bound) in windows.iter().zip(&bounds) {
                    let mut inside = vec![0u32; size];
                    for r in records.iter().filter(|r| window.contains(r.delay as u32)) {
                        inside[r.source.index()] += 1;
                    }
                    prop_assert!(
                        inside.iter().all(|&c| c <= bound),
                        "window {} bound {} observed {:?}", window, bound, inside
                    );
                }
            }
        }
    }

    #[test]
    fn bound_queries_are_idempotent(expr in arb_expression(), size in 1usize..20, seed in any::<u64>()) {
        let pop = line(0, size);
        let mut conn = configured(expr, false, &pop, seed);
        let slice = Slice::whole(size);
        let before = (
            conn.get_n_connections_maximum().unwrap(),
            conn.get_n_connections_to_post_vertex_maximum().unwrap(),
            conn.get_n_connections_from_pre_vertex_maximum(&slice, None).unwrap(),
            conn.get_weight_maximum().unwrap(),
            conn.get_delay_maximum().unwrap(),
        );
        conn.create_synaptic_block(&[slice], 0, &[slice], 0, 0).unwrap();
        let after = (
            conn.get_n_connections_maximum().unwrap(),
            conn.get_n_connections_to_post_vertex_maximum().unwrap(),
            conn.get_n_connections_from_pre_vertex_maximum(&slice, None).unwrap(),
            conn.get_weight_maximum().unwrap(),
            conn.get_delay_maximum().unwrap(),
        );
        prop_assert_eq!(before, after);
    }

    #[test]
    fn same_seed_same_blocks(expr in arb_expression(), size in 1usize..20, seed in any::<u64>()) {
        let pop = line(0, size);
        let run = || {
            let conn = configured(expr, false, &pop, seed);
            let mut projection = Projection::new(ProjectionId::new(1), &pop, &pop, conn, 0, seed, 1000).unwrap();
            let plan = projection.plan(&FixedAtomsPartitioner::new(6).unwrap()).unwrap();
            projection.generate(&plan).unwrap()
        };
        let a: Vec<Vec<u8>> = run().iter().map(|b| b.to_bytes()).collect();
        let b: Vec<Vec<u8>> = run().iter().map(|b| b.to_bytes()).collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn empty_post_slice_draws_nothing(size in 1usize..10, at in 0usize..10, seed in any::<u64>()) {
        let pop = line(0, size);
        let mut conn = configured("0.5", false, &pop, seed);
        let at = at.min(size);
        let pre = [Slice::whole(size)];
        let post = [Slice::new(at, at).unwrap(), Slice::whole(size)];

        let mut reference = configured("0.5", false, &pop, seed);
        prop_assert!(conn.create_synaptic_block(&pre, 0, &post, 0, 0).unwrap().is_empty());
        prop_assert_eq!(
            conn.create_synaptic_block(&pre, 0, &post, 1, 0).unwrap(),
            reference.create_synaptic_block(&pre, 0, &post, 1, 0).unwrap()
        );
    }
}
