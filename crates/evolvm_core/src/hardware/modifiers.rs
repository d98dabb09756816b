//! Operand resolution from the no-ops that follow an instruction.

use super::Hardware;
use crate::context::NUM_REGISTERS;
use crate::head::HeadKind;
use crate::label::read_label_at;
use evolvm_data::CodeLabel;

impl Hardware {
    /// Modifier of the instruction right after the IP, if it is a no-op.
    /// Never wraps: past the end there is no modifier.
    fn peek_modifier(&self) -> Option<u8> {
        let (space, pos) = self.head_location(self.cur, HeadKind::Ip);
        self.inst_set.nop_mod(self.memory(space).get(pos + 1))
    }

    /// Steps the IP onto the modifier it just peeked and marks it executed.
    fn consume_modifier(&mut self) {
        let ctx = self.cur;
        self.contexts[ctx].head_mut(HeadKind::Ip).advance();
        self.adjust_head(ctx, HeadKind::Ip);
        let (space, pos) = self.head_location(ctx, HeadKind::Ip);
        self.mark_executed(space, pos);
    }

    pub(super) fn find_modified_register(&mut self, default: usize) -> usize {
        match self.peek_modifier() {
            Some(m) => {
                self.consume_modifier();
                usize::from(m) % NUM_REGISTERS
            }
            None => default,
        }
    }

    /// Like [`Self::find_modified_register`], falling back to the register
    /// after `default`.
    pub(super) fn find_modified_next_register(&mut self, default: usize) -> usize {
        match self.peek_modifier() {
            Some(m) => {
                self.consume_modifier();
                usize::from(m) % NUM_REGISTERS
            }
            None => (default + 1) % NUM_REGISTERS,
        }
    }

    pub(super) fn find_modified_head(&mut self, default: HeadKind) -> HeadKind {
        match self.peek_modifier() {
            Some(m) => {
                self.consume_modifier();
                HeadKind::from_modifier(m)
            }
            None => default,
        }
    }

    /// Reads the label after the IP into the context, leaving the IP on its
    /// last no-op. The first `max_label_exe_size` no-ops are marked executed.
    pub(super) fn read_label(&mut self) -> CodeLabel {
        let ctx = self.cur;
        let (space, pos) = self.head_location(ctx, HeadKind::Ip);
        let max = self.config.hardware.max_label_size;
        let label = read_label_at(self.memory(space), &self.inst_set, pos, max);

        let exe = label.len().min(self.config.hardware.max_label_exe_size);
        for offset in 1..=exe {
            self.mark_executed(space, pos + offset);
        }
        if !label.is_empty() {
            self.contexts[ctx].head_mut(HeadKind::Ip).jump(label.len() as i64);
            self.adjust_head(ctx, HeadKind::Ip);
        }
        self.contexts[ctx].label = label.clone();
        label
    }

    /// Skips the instruction after the IP. The normal advance still follows.
    pub(super) fn skip_next(&mut self) {
        let ctx = self.cur;
        self.contexts[ctx].head_mut(HeadKind::Ip).advance();
        self.adjust_head(ctx, HeadKind::Ip);
    }
}
