mod common;

use common::HardwareBuilder;
use evolvm_lib::model::config::ThreadSlicing;
use evolvm_lib::model::context::ContextStatus;
use evolvm_lib::model::head::HeadKind;
use evolvm_lib::model::organism::FaultKind;
use evolvm_lib::model::registry::{REG_AX, REG_BX, REG_CX, REG_DX, REG_EX};

const REG_FX: usize = 5;

/// One attempt per call, so each step advances a single context.
fn interleaved() -> HardwareBuilder {
    HardwareBuilder::new().with_slicing(ThreadSlicing::Shared)
}

#[test]
fn test_wait_as_only_active_context_fails() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["wait-cond-equ", "inc", "nop-X"])
        .build();
    hw.set_register(0, REG_BX, 5);

    assert!(!hw.single_process(&mut org));

    assert_status!(hw, 0, ContextStatus::Active);
    assert_ip!(hw, 0, 1);
}

#[test]
fn test_kill_last_context_is_rejected() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["kill-thread", "nop-X"])
        .build();

    assert!(!hw.single_process(&mut org));
    assert_status!(hw, 0, ContextStatus::Active);
    assert_eq!(hw.active_count(), 1);
    assert!(!hw.kill_context(0));
}

#[test]
fn test_fork_then_kill() {
    let (mut hw, mut org) = interleaved()
        .with_genome(&["fork-thread", "id-thread", "kill-thread", "nop-X"])
        .build();

    hw.step(&mut org);
    assert_eq!(hw.contexts().len(), 2);
    assert_ip!(hw, 1, 1);

    // Context 1 reads its id.
    hw.step(&mut org);
    assert_register!(hw, 1, REG_BX, 1);

    // Context 0 reads its id, then context 1 kills itself.
    hw.step(&mut org);
    assert_register!(hw, 0, REG_BX, 0);
    hw.step(&mut org);
    assert_status!(hw, 1, ContextStatus::Cancelled);
    assert_eq!(hw.active_count(), 1);
}

#[test]
fn test_fork_respects_thread_limit() {
    let (mut hw, mut org) = HardwareBuilder::new()
        .with_genome(&["fork-thread", "nop-X"])
        .with_config(|c| c.hardware.max_threads = 1)
        .build();

    assert!(!hw.single_process(&mut org));
    assert_eq!(hw.contexts().len(), 1);
    assert_eq!(org.faults[0].kind, FaultKind::ThreadLimit);
}

/// Three contexts: 0 writes DX, 1 waits for DX == 7 into EX, 2 waits for
/// EX == 7 into FX.
#[test]
fn test_wake_cascades_through_destinations() {
    let (mut hw, mut org) = interleaved()
        .with_genome(&[
            "fork-thread",
            "fork-thread",
            "nop-X",
            "nop-X",
            "wait-cond-equ",
            "nop-A",
            "nop-D",
            "nop-E",
            "inc",
            "wait-cond-equ",
            "nop-C",
            "nop-E",
            "nop-F",
            "inc",
        ])
        .build();

    // Context 0 forks 1, then 1 forks 2.
    hw.step(&mut org);
    hw.step(&mut org);
    assert_eq!(hw.contexts().len(), 3);

    hw.set_head(0, HeadKind::Ip, 2);
    hw.set_head(1, HeadKind::Ip, 4);
    hw.set_head(2, HeadKind::Ip, 9);
    hw.set_register(1, REG_AX, 7);
    hw.set_register(2, REG_CX, 7);

    // Scheduling continues with 2, then 0, then 1.
    hw.step(&mut org);
    assert_status!(hw, 2, ContextStatus::Waiting(_));
    hw.step(&mut org);
    hw.step(&mut org);
    assert_status!(hw, 1, ContextStatus::Waiting(_));
    assert_eq!(hw.active_count(), 1);

    hw.set_register(0, REG_DX, 7);

    assert_status!(hw, 1, ContextStatus::Active);
    assert_status!(hw, 2, ContextStatus::Active);
    assert_register!(hw, 1, REG_EX, 7);
    assert_register!(hw, 2, REG_FX, 7);
    assert_eq!(hw.active_count(), 3);
}

#[test]
fn test_wait_already_satisfied_copies_value() {
    let (mut hw, mut org) = interleaved()
        .with_genome(&["fork-thread", "wait-cond-gtr", "nop-X"])
        .build();

    // Context 0 forks; context 1 sits on the wait.
    hw.step(&mut org);
    hw.set_register(0, REG_DX, 40);
    hw.set_register(1, REG_BX, 10);

    hw.step(&mut org);
    assert_status!(hw, 1, ContextStatus::Active);
    // Destination defaults to the threshold register.
    assert_register!(hw, 1, REG_BX, 40);
    assert_register!(hw, 1, REG_CX, 0);
}

#[test]
fn test_jump_thread_wakes_waiting_target() {
    let (mut hw, mut org) = interleaved()
        .with_genome(&["fork-thread", "wait-cond-equ", "jump-thread", "nop-X"])
        .build();

    hw.step(&mut org);
    hw.set_register(1, REG_BX, 99);
    hw.step(&mut org);
    assert_status!(hw, 1, ContextStatus::Waiting(_));

    // Context 0 runs jump-thread with BX = 1.
    hw.set_head(0, HeadKind::Ip, 2);
    hw.set_register(0, REG_BX, 1);
    hw.step(&mut org);
    assert_status!(hw, 1, ContextStatus::Active);
    assert_eq!(hw.current(), 1);
}

#[test]
fn test_cancelled_sibling_does_not_satisfy_wait() {
    let (mut hw, mut org) = interleaved()
        .with_genome(&["fork-thread", "fork-thread", "wait-cond-equ", "nop-X"])
        .build();
    hw.step(&mut org);
    hw.step(&mut org);
    assert_eq!(hw.contexts().len(), 3);

    // Context 2 holds the awaited value, then is cancelled.
    hw.set_register(2, REG_DX, 7);
    assert!(hw.kill_context(2));
    hw.set_register(0, REG_BX, 7);
    hw.set_head(0, HeadKind::Ip, 2);

    hw.step(&mut org);
    assert_status!(hw, 0, ContextStatus::Waiting(_));
    assert_eq!(hw.active_count(), 1);
}
