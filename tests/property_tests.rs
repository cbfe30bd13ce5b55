//! Property tests for the estimator and recommender

use proptest::prelude::*;
use vram_advisor::config::PARAM_SIZE_PRESETS;
use vram_advisor::hardware::{estimate_speedup, Suitability};
use vram_advisor::memory_estimator::{calculate_model_weights, calculate_total_memory};
use vram_advisor::{
    get_gpu_by_use_case, get_gpu_recommendations, ArchitectureConfig, GpuCatalog, Precision,
    UseCase, WorkloadParams,
};

prop_compose! {
    fn arb_architecture()(
        heads in 1u64..=64,
        head_dim in prop::sample::select(vec![32u64, 64, 128]),
        kv_divisor in prop::sample::select(vec![1u64, 2, 4, 8]),
        layers in 1u64..=96,
        vocab in 1_000u64..=200_000,
        ffn_mult in 2u64..=5,
    ) -> ArchitectureConfig {
        let hidden = heads * head_dim;
        ArchitectureConfig {
            vocab_size: Some(vocab),
            hidden_size: Some(hidden),
            num_hidden_layers: Some(layers),
            num_attention_heads: Some(heads),
            num_key_value_heads: Some((heads / kv_divisor).max(1)),
            intermediate_size: Some(hidden * ffn_mult),
            ..Default::default()
        }
    }
}

fn arb_workload() -> impl Strategy<Value = WorkloadParams> {
    (
        prop::sample::select(Precision::ALL.to_vec()),
        1usize..=16,
        prop::sample::select(vec![256usize, 512, 2048, 4096, 32768]),
        any::<bool>(),
    )
        .prop_map(|(precision, batch_size, sequence_length, is_training)| WorkloadParams {
            precision,
            batch_size,
            sequence_length,
            is_training,
        })
}

proptest! {
    #[test]
    fn prop_weights_follow_precision(config in arb_architecture()) {
        let fp32 = calculate_model_weights(&config, Precision::Fp32).unwrap();
        let fp16 = calculate_model_weights(&config, Precision::Fp16).unwrap();
        let int8 = calculate_model_weights(&config, Precision::Int8).unwrap();
        let int4 = calculate_model_weights(&config, Precision::Int4).unwrap();

        // Each figure is rounded to 0.01 on its own
        prop_assert!((fp32 - 2.0 * fp16).abs() <= 0.02);
        prop_assert!((fp16 - 2.0 * int8).abs() <= 0.02);
        prop_assert!((int8 - 2.0 * int4).abs() <= 0.02);
    }

    #[test]
    fn prop_total_matches_mode(config in arb_architecture(), workload in arb_workload()) {
        let req = calculate_total_memory(&config, &workload).unwrap();

        if workload.is_training {
            prop_assert_eq!(req.total, req.training);
        } else {
            prop_assert_eq!(req.optimizer, 0.0);
            prop_assert_eq!(req.total, req.inference);
        }
        prop_assert!(req.training >= req.inference);
        prop_assert!(req.kv_cache >= 0.0 && req.activations >= 0.0);
    }

    #[test]
    fn prop_recommendations_never_insufficient(
        config in arb_architecture(),
        workload in arb_workload(),
    ) {
        let req = calculate_total_memory(&config, &workload).unwrap();
        let result = get_gpu_recommendations(GpuCatalog::builtin(), &req, workload.is_training);

        for group in [&result.recommended, &result.budget, &result.professional] {
            prop_assert!(group.len() <= 3);
            for rec in group.iter() {
                prop_assert!(rec.suitability != Suitability::Insufficient);
                prop_assert!(rec.utilization_rate <= 100.0);
            }
        }

        // No comfortable single card means a multi-GPU plan is offered
        let top_is_tight = result.recommended.first().map_or(true, |r| r.utilization_rate > 90.0);
        prop_assert_eq!(top_is_tight, result.multi_gpu.is_some());
        if let Some(plan) = result.multi_gpu {
            prop_assert!(plan.gpu_count >= 1);
            prop_assert!(plan.total_memory >= req.required_gb(workload.is_training));
        }
    }

    #[test]
    fn prop_use_case_sorted_and_bounded(
        config in arb_architecture(),
        workload in arb_workload(),
        use_case in prop::sample::select(vec![UseCase::Inference, UseCase::Training, UseCase::Development]),
    ) {
        let req = calculate_total_memory(&config, &workload).unwrap();
        let recs = get_gpu_by_use_case(GpuCatalog::builtin(), use_case, &req);

        prop_assert!(recs.len() <= 5);
        prop_assert!(recs.windows(2).all(|w| w[0].suitability >= w[1].suitability));
        prop_assert!(recs.iter().all(|r| r.suitability != Suitability::Insufficient));
    }

    #[test]
    fn prop_speedup_sublinear(gpu_count in 2u32..=64) {
        let speedup = estimate_speedup(gpu_count);
        prop_assert!(speedup < gpu_count as f64);
        prop_assert!(speedup >= estimate_speedup(gpu_count - 1));
    }
}

#[test]
fn test_single_gpu_speedup() {
    assert_eq!(estimate_speedup(1), 1.0);
}

#[test]
fn test_every_preset_is_estimable() {
    for (_, preset) in PARAM_SIZE_PRESETS.iter() {
        for precision in Precision::ALL {
            let workload = WorkloadParams::training(precision, 1, 2048);
            let req = calculate_total_memory(preset, &workload).unwrap();
            assert!(req.model_weights > 0.0);
            assert!(req.kv_cache > 0.0);
        }
    }
}
