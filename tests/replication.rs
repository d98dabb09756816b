mod common;

use common::{registers, run_until_offspring, HardwareBuilder};
use evolvm_lib::model::ancestor::ancestor_genome;
use evolvm_lib::model::config::{AppConfig, DivideMethod, SchedulingPolicy};
use evolvm_lib::model::head::HeadKind;
use evolvm_lib::model::lineage::LineageRunner;
use evolvm_lib::model::state::{Genome, LocusFlags};
use evolvm_lib::model::InstSet;
use std::sync::Arc;

const BODY: [&str; 10] = [
    "inc", "nop-A", "push", "label", "nop-B", "nop-C", "swap", "dec", "nop-X", "IO",
];

fn body_genome() -> Genome {
    let set = InstSet::standard();
    Genome::new(set.parse_names(BODY).expect("names"))
}

#[test]
fn test_ancestor_replicates_under_round_robin() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_ancestor()
        .with_policy(SchedulingPolicy::RoundRobin)
        .build();
    let ancestor = ancestor_genome(hw.inst_set()).expect("ancestor");

    let child = run_until_offspring(&mut hw, &mut org, 10_000).expect("Ancestor is sterile");

    assert_eq!(child, ancestor);
    assert_eq!(hw.stats().divides, 1);
    assert_eq!(hw.stats().failed_divides, 0);
    assert_eq!(hw.stats().copies, ancestor.len() as u64);
}

#[test]
fn test_ancestor_replicates_under_behavior_classing() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_ancestor()
        .with_policy(SchedulingPolicy::BehaviorClassed)
        .build();
    let ancestor = ancestor_genome(hw.inst_set()).expect("ancestor");

    let child = run_until_offspring(&mut hw, &mut org, 10_000).expect("Ancestor is sterile");

    assert_eq!(child, ancestor);
    assert!(!hw.genes().is_empty());
}

#[test]
fn test_ancestor_keeps_replicating_after_split() {
    let (mut hw, mut org) = HardwareBuilder::new().with_ancestor().build();
    let ancestor = ancestor_genome(hw.inst_set()).expect("ancestor");

    for _ in 0..3 {
        let child = run_until_offspring(&mut hw, &mut org, 10_000).expect("Ancestor is sterile");
        assert_eq!(child, ancestor);
    }
    assert_eq!(hw.stats().divides, 3);
}

#[test]
fn test_error_free_copy_loop_is_exact() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_raw_genome(body_genome())
        .with_permissive_divide()
        .build();
    let copy = hw.inst_set().instruction("copy").expect("copy");
    let divide = hw.inst_set().instruction("divide").expect("divide");

    for _ in 0..BODY.len() {
        assert!(hw.execute_instruction(&mut org, copy));
    }
    let offspring = hw.offspring().expect("Offspring not created");
    assert_eq!(offspring.instructions(), hw.parent().instructions());
    for pos in 0..BODY.len() {
        assert_flag!(offspring, pos, LocusFlags::COPIED);
        assert!(!offspring.has_flag(pos, LocusFlags::MUTATED));
    }

    assert!(hw.execute_instruction(&mut org, divide));
    assert_eq!(org.offspring, vec![body_genome()]);
}

#[test]
fn test_certain_copy_mutation_flags_every_locus() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_raw_genome(body_genome())
        .with_config(|c| c.mutation.copy_mut_prob = 1.0)
        .build();
    let copy = hw.inst_set().instruction("copy").expect("copy");

    for _ in 0..BODY.len() {
        hw.execute_instruction(&mut org, copy);
    }
    let offspring = hw.offspring().expect("Offspring not created");
    for pos in 0..BODY.len() {
        assert_flag!(offspring, pos, LocusFlags::COPY_MUTATED);
    }
    assert_eq!(hw.stats().copy_mutations, BODY.len() as u64);
}

#[test]
fn test_rejected_divide_leaves_parent_untouched() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["copy", "copy", "copy", "divide", "nop-X"])
        .with_config(|c| c.divide.min_genome_length = 100)
        .build();
    for _ in 0..3 {
        hw.single_process(&mut org);
    }
    let before = hw.context(0).cloned().expect("Context not found");
    let parent = hw.parent().instructions().to_vec();

    assert!(!hw.single_process(&mut org));

    let after = hw.context(0).expect("Context not found");
    assert_eq!(after.registers, before.registers);
    for kind in [HeadKind::Read, HeadKind::Write, HeadKind::Flow] {
        assert_eq!(after.head(kind), before.head(kind));
    }
    assert_ip!(hw, 0, 4);
    assert_eq!(hw.parent().instructions(), parent.as_slice());
    assert!(hw.offspring().is_none());
    assert!(!hw.has_alloc());
    assert!(org.offspring.is_empty());
    assert_eq!(hw.stats().failed_divides, 1);
}

#[test]
fn test_alloc_then_copy_then_divide() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["alloc", "copy", "copy", "copy", "copy", "divide", "nop-X", "nop-X"])
        .with_permissive_divide()
        .build();

    assert!(hw.single_process(&mut org));
    assert!(hw.has_alloc());
    assert_eq!(hw.offspring().map(|o| o.len()), Some(16));

    for _ in 0..5 {
        hw.single_process(&mut org);
    }
    assert_eq!(org.offspring.len(), 1);
    let child = &org.offspring[0];
    assert_eq!(child.len(), 4);
    assert_eq!(child.instructions[..], hw.parent().instructions()[..4]);
    // Split resets the parent.
    assert_ip!(hw, 0, 0);
    assert!(!hw.has_alloc());
    assert_eq!(registers(&hw, 0), [0; 8]);
}

#[test]
fn test_offspring_method_keeps_parent_running() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["inc", "repro", "inc", "nop-X"])
        .with_permissive_divide()
        .with_config(|c| c.divide.method = DivideMethod::Offspring)
        .build();

    hw.single_process(&mut org);
    assert!(hw.single_process(&mut org));

    assert_eq!(org.offspring.len(), 1);
    assert_ip!(hw, 0, 2);
    assert_register!(hw, 0, 1, 1);
}

#[test]
fn test_lineage_runner_over_ancestor() {
    let inst_set = Arc::new(InstSet::standard());
    let ancestor = ancestor_genome(&inst_set).expect("ancestor");
    let runner = LineageRunner::new(Arc::clone(&inst_set), Arc::new(AppConfig::default()));

    let reports = runner.run_replicates(&ancestor, 4, 11, 2);

    assert_eq!(reports.len(), 2);
    for report in reports {
        let report = report.expect("lineage run");
        assert_eq!(report.generations.len(), 4);
        assert_eq!(report.final_genome, ancestor);
        assert!(report.mean_gestation().expect("gestations") > 0.0);
    }
    assert_eq!(runner.metrics().generations(), 8);
}

#[test]
fn test_same_seed_same_offspring() {
    let build = || {
        HardwareBuilder::new()
            .with_ancestor()
            .with_seed(1234)
            .with_config(|c| {
                c.mutation.copy_mut_prob = 0.2;
                c.mutation.divide_ins_prob = 0.5;
            })
            .build()
    };
    let (mut hw1, mut org1) = build();
    let (mut hw2, mut org2) = build();

    let first = run_until_offspring(&mut hw1, &mut org1, 20_000);
    let second = run_until_offspring(&mut hw2, &mut org2, 20_000);

    assert_eq!(first, second);
    assert_eq!(hw1.stats(), hw2.stats());
}
