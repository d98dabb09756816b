mod common;

use common::{registers, HardwareBuilder};
use evolvm_lib::model::config::InstEntryConfig;
use evolvm_lib::model::head::HeadKind;
use evolvm_lib::model::registry::{InstSet, REG_AX, REG_BX, REG_CX};
use evolvm_lib::model::state::{Genome, LocusFlags};
use evolvm_lib::model::organism::FaultKind;

#[test]
fn test_nop_changes_nothing_but_ip() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["nop-C", "inc", "nop-X"])
        .build();
    hw.set_register(0, REG_AX, 11);
    hw.set_register(0, REG_CX, -4);
    let before = hw.context(0).cloned().expect("Context not found");

    assert!(hw.single_process(&mut org));

    let after = hw.context(0).expect("Context not found");
    assert_eq!(after.registers, before.registers);
    assert_eq!(after.stacks, before.stacks);
    assert_eq!(after.cur_stack, before.cur_stack);
    for kind in [HeadKind::Read, HeadKind::Write, HeadKind::Flow] {
        assert_eq!(after.head(kind), before.head(kind));
    }
    assert_ip!(hw, 0, 1);
}

#[test]
fn test_add_sums_without_touching_operand() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["add", "nop-A", "nop-A", "nop-B", "nop-X"])
        .build();
    hw.set_register(0, REG_AX, 5);
    hw.set_register(0, REG_BX, 3);

    assert!(hw.single_process(&mut org));

    assert_register!(hw, 0, REG_AX, 8);
    assert_register!(hw, 0, REG_BX, 3);
    assert_ip!(hw, 0, 4);
}

#[test]
fn test_default_operands_write_bx() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["add", "inc", "nop-X"])
        .build();
    hw.set_register(0, REG_BX, 2);
    hw.set_register(0, REG_CX, 9);

    assert!(hw.single_process(&mut org));

    // add: BX = BX + CX
    assert_register!(hw, 0, REG_BX, 11);
    assert_ip!(hw, 0, 1);
}

#[test]
fn test_three_cycle_cost_defers_side_effects() {
    let mut inc = InstEntryConfig::named("inc");
    inc.cost = 3;
    let set = InstSet::from_config(&[InstEntryConfig::named("nop-X"), inc]).expect("valid set");
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_inst_set(set)
        .with_raw_genome(Genome::from_bytes(&[1, 0, 0, 0]))
        .build();

    for _ in 0..2 {
        assert!(!hw.single_process(&mut org));
        assert_register!(hw, 0, REG_BX, 0);
        assert_ip!(hw, 0, 0);
        assert!(!hw.parent().has_flag(0, LocusFlags::EXECUTED));
    }
    assert!(hw.single_process(&mut org));
    assert_register!(hw, 0, REG_BX, 1);
    assert_ip!(hw, 0, 1);
    assert_flag!(hw.parent(), 0, LocusFlags::EXECUTED);
    assert_eq!(hw.stats().stalls, 2);
}

#[test]
fn test_first_time_cost_paid_once() {
    let mut inc = InstEntryConfig::named("inc");
    inc.first_time_cost = 2;
    let set = InstSet::from_config(&[InstEntryConfig::named("nop-X"), inc]).expect("valid set");
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_inst_set(set)
        .with_raw_genome(Genome::from_bytes(&[1, 1]))
        .build();

    assert!(!hw.single_process(&mut org));
    assert!(hw.single_process(&mut org));
    assert_register!(hw, 0, REG_BX, 1);
    // Second inc pays no first-time cost.
    assert!(hw.single_process(&mut org));
    assert_register!(hw, 0, REG_BX, 2);
}

#[test]
fn test_ip_wraps_at_both_ends() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["nop-X", "nop-X", "nop-X", "jmp-head"])
        .build();
    for _ in 0..3 {
        hw.single_process(&mut org);
    }
    assert_ip!(hw, 0, 3);

    // jmp-head moves IP by CX: 3 + 5 wraps forward to 0.
    hw.set_register(0, REG_CX, 5);
    assert!(hw.single_process(&mut org));
    assert_ip!(hw, 0, 0);

    // 3 - 6 wraps backward to 1.
    hw.set_head(0, HeadKind::Ip, 3);
    hw.set_register(0, REG_CX, -6);
    assert!(hw.single_process(&mut org));
    assert_ip!(hw, 0, 1);
}

#[test]
fn test_division_by_zero_faults() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["div", "nop-X"])
        .build();
    hw.set_register(0, REG_BX, 10);

    assert!(!hw.single_process(&mut org));

    assert_register!(hw, 0, REG_BX, 10);
    assert_eq!(org.faults.len(), 1);
    assert_eq!(org.faults[0].kind, FaultKind::Arithmetic);
    assert_eq!(hw.stats().faults, 1);
    assert_ip!(hw, 0, 1);
}

#[test]
fn test_io_round_trip() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["IO", "IO", "nop-X"])
        .with_inputs(vec![21, 34])
        .build();

    hw.set_register(0, REG_BX, 5);
    assert!(hw.single_process(&mut org));
    assert_register!(hw, 0, REG_BX, 21);
    assert!(hw.single_process(&mut org));
    assert_register!(hw, 0, REG_BX, 34);
    assert_eq!(org.outputs, vec![5, 21]);
}

#[test]
fn test_stacks_push_pop_and_switch() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["push", "swap-stk", "pop", "swap-stk", "pop", "nop-X"])
        .build();
    hw.set_register(0, REG_BX, 17);

    for _ in 0..3 {
        hw.single_process(&mut org);
    }
    // Popping the empty second stack yields zero.
    assert_register!(hw, 0, REG_BX, 0);
    hw.single_process(&mut org);
    hw.single_process(&mut org);
    assert_register!(hw, 0, REG_BX, 17);
    assert_eq!(registers(&hw, 0)[REG_AX], 0);
}

#[test]
fn test_conditional_skips_next_instruction() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["if-n-equ", "inc", "inc", "nop-X"])
        .build();
    hw.set_register(0, REG_BX, 4);
    hw.set_register(0, REG_CX, 4);

    assert!(hw.single_process(&mut org));
    // BX == CX: the first inc is skipped.
    assert_ip!(hw, 0, 2);
    hw.single_process(&mut org);
    assert_register!(hw, 0, REG_BX, 5);
}

#[test]
fn test_die_ends_organism_after_the_call() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["die", "nop-X"])
        .build();
    assert!(org.is_alive());
    hw.step(&mut org);
    assert!(!org.is_alive());
}

#[test]
fn test_max_executed_kills() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["inc", "inc", "inc"])
        .with_config(|c| c.hardware.max_executed = 5)
        .build();
    for _ in 0..4 {
        hw.step(&mut org);
        assert!(org.is_alive());
    }
    hw.step(&mut org);
    assert!(!org.is_alive());
}
