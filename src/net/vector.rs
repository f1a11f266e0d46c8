//! 向量代数：容量约束下的整数向量加法。
//!
//! 对状态 `M ∈ ℕ^{|P|}`、增量 `Δ ∈ ℤ^{|P|}` 与倍数 `k ≥ 1`，计算
//! `out[i] = M[i] + k·Δ[i]`。当且仅当每个分量满足 `out[i] ≥ 0`，
//! 且在 `cap[i] > 0` 时 `out[i] ≤ cap[i]`，结果记为 `ok`。

use crate::net::structure::{DeltaRow, Weight};

/// 一次受限加法的结果。越界时 `out` 仍然返回，
/// 调用方可以检查具体哪一维下溢或超容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    pub out: DeltaRow,
    pub ok: bool,
}

/// Pure capacity-bounded addition; the only arithmetic the engine performs.
pub fn vector_add(
    state: &[Weight],
    delta: &[i64],
    multiplier: Weight,
    capacity: &[Weight],
) -> AddOutcome {
    debug_assert_eq!(state.len(), delta.len());
    debug_assert_eq!(state.len(), capacity.len());

    let mut out = DeltaRow::with_capacity(state.len());
    let mut ok = true;
    for ((&tokens, &change), &bound) in state.iter().zip(delta).zip(capacity) {
        let next = tokens as i64 + change * multiplier as i64;
        if next < 0 || (bound > 0 && next > bound as i64) {
            ok = false;
        }
        out.push(next);
    }
    AddOutcome { out, ok }
}
