//! 发生语义：守卫检查、试发射与按模式提交。
use thiserror::Error;

use crate::net::definition::PetriNet;
use crate::net::structure::{DeltaRow, Marking, NetMode, Role, Transition, Weight};
use crate::net::vector::{AddOutcome, vector_add};

/// 致命（编程）错误层；可恢复的发射拒绝一律通过 [`FireOutcome::ok`] 返回。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("net {0:?} has not been indexed")]
    NotIndexed(String),
    #[error("multiplier must be a positive integer")]
    ZeroMultiplier,
    #[error("vector length {found} does not match place count {expected}")]
    ShapeMismatch { expected: usize, found: usize },
}

/// 一次（试）发射的结构化结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireOutcome {
    /// 原始结果向量；守卫封锁时为 `None`。
    pub out: Option<DeltaRow>,
    pub ok: bool,
    pub role: Role,
}

impl PetriNet {
    fn action(&self, action: &str) -> Result<&Transition, ModelError> {
        self.transitions
            .get(action)
            .ok_or_else(|| ModelError::UnknownAction(action.to_string()))
    }

    fn check_ready(&self, marking: &Marking, multiplier: Weight) -> Result<(), ModelError> {
        if !self.indexed {
            return Err(ModelError::NotIndexed(self.schema.clone()));
        }
        if multiplier == 0 {
            return Err(ModelError::ZeroMultiplier);
        }
        if marking.len() != self.places.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.places.len(),
                found: marking.len(),
            });
        }
        Ok(())
    }

    fn guard_active(
        &self,
        transition: &Transition,
        marking: &Marking,
        multiplier: Weight,
        capacity: &[Weight],
    ) -> bool {
        transition
            .guards
            .values()
            .any(|guard| vector_add(marking.as_slice(), &guard.delta, multiplier, capacity).ok)
    }

    /// 任一守卫处于活动状态（抑制库所令牌充足）即返回 true。
    pub fn guard_check(
        &self,
        marking: &Marking,
        action: &str,
        multiplier: Weight,
    ) -> Result<bool, ModelError> {
        self.check_ready(marking, multiplier)?;
        let transition = self.action(action)?;
        let capacity = self.capacity_vector();
        Ok(self.guard_active(transition, marking, multiplier, capacity.as_slice()))
    }

    /// 纯试发射，不触碰标识。
    pub fn test_fire(
        &self,
        marking: &Marking,
        action: &str,
        multiplier: Weight,
    ) -> Result<FireOutcome, ModelError> {
        self.check_ready(marking, multiplier)?;
        let transition = self.action(action)?;
        let role = transition.role.clone();
        let capacity = self.capacity_vector();
        if self.guard_active(transition, marking, multiplier, capacity.as_slice()) {
            return Ok(FireOutcome {
                out: None,
                ok: false,
                role,
            });
        }
        let AddOutcome { out, ok } = vector_add(
            marking.as_slice(),
            &transition.delta,
            multiplier,
            capacity.as_slice(),
        );
        Ok(FireOutcome {
            out: Some(out),
            ok,
            role,
        })
    }

    /// 发射：在试发射之上套用模式规则，接受则就地提交标识。
    /// 每次调用都终止于提交或拒绝，没有其他终态。
    pub fn fire(
        &self,
        marking: &mut Marking,
        action: &str,
        multiplier: Weight,
    ) -> Result<FireOutcome, ModelError> {
        let mut outcome = self.test_fire(marking, action, multiplier)?;
        self.apply_mode(&mut outcome);
        if outcome.ok {
            if let Some(out) = outcome.out.as_ref() {
                // 接受时所有分量非负（workflow 已先清掉负值）
                for (slot, &next) in marking.as_mut_slice().iter_mut().zip(out.iter()) {
                    *slot = next as Weight;
                }
            }
        }
        Ok(outcome)
    }

    /// 模式后处理：
    /// * petriNet: 原样接受 `test.ok`；
    /// * stateMachine: 额外要求结果至多一个正分量且无分量超过 1；
    /// * workflow: 负分量清零（下溢被宽恕），再按同一基数规则裁决。
    fn apply_mode(&self, outcome: &mut FireOutcome) {
        match self.mode {
            NetMode::PetriNet => {}
            NetMode::StateMachine => {
                if let Some(out) = outcome.out.as_ref() {
                    outcome.ok = outcome.ok && elementary(out);
                }
            }
            NetMode::Workflow => {
                if let Some(out) = outcome.out.as_mut() {
                    for entry in out.iter_mut() {
                        if *entry < 0 {
                            *entry = 0;
                        }
                    }
                    outcome.ok = elementary(out);
                }
            }
        }
    }

    /// 当前标识下按完整模式规则可接受的动作。
    pub fn enabled_actions(&self, marking: &Marking) -> Vec<&str> {
        self.transitions
            .keys()
            .map(String::as_str)
            .filter(|action| {
                self.test_fire(marking, action, 1)
                    .map(|mut outcome| {
                        self.apply_mode(&mut outcome);
                        outcome.ok
                    })
                    .unwrap_or(false)
            })
            .collect()
    }
}

fn elementary(out: &[i64]) -> bool {
    let mut positive = 0;
    for &entry in out {
        if entry > 1 {
            return false;
        }
        if entry > 0 {
            positive += 1;
        }
    }
    positive <= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::ids::PlaceId;
    use crate::net::structure::Position;

    fn two_place_net(mode: NetMode) -> PetriNet {
        let mut net = PetriNet::declare("demo", mode, |b| {
            let role = b.role("default");
            let p1 = b.place("p1", 1, 0, Position::new(0, 0));
            let p2 = b.place("p2", 0, 0, Position::new(100, 0));
            let t = b.transition("t", &role, Position::new(50, 0));
            p1.tx(b, 1, &t);
            t.tx(b, 1, &p2);
        });
        net.index().unwrap();
        net
    }

    #[test]
    fn fire_moves_a_token() {
        let net = two_place_net(NetMode::PetriNet);
        let mut marking = net.initial_marking();
        let outcome = net.fire(&mut marking, "t", 1).unwrap();
        assert!(outcome.ok);
        assert_eq!(marking.as_slice(), &[0, 1]);
        assert_eq!(outcome.role.label, "default");
    }

    #[test]
    fn underflow_rejects_and_leaves_marking_alone() {
        let net = two_place_net(NetMode::PetriNet);
        let mut marking = net.initial_marking();
        assert!(net.fire(&mut marking, "t", 1).unwrap().ok);
        let second = net.fire(&mut marking, "t", 1).unwrap();
        assert!(!second.ok);
        assert_eq!(second.out.as_ref().map(|out| out[0]), Some(-1));
        assert_eq!(marking.as_slice(), &[0, 1]);
    }

    #[test]
    fn active_guard_blocks_even_when_arithmetic_would_succeed() {
        let mut net = PetriNet::declare("guarded", NetMode::PetriNet, |b| {
            let role = b.role("default");
            let p1 = b.place("p1", 1, 0, Position::default());
            let p2 = b.place("p2", 0, 0, Position::default());
            let brake = b.place("brake", 1, 0, Position::default());
            let t = b.transition("t", &role, Position::default());
            p1.tx(b, 1, &t);
            t.tx(b, 1, &p2);
            brake.guard(b, 1, &t);
        });
        net.index().unwrap();
        let mut marking = net.initial_marking();

        assert!(net.guard_check(&marking, "t", 1).unwrap());
        let outcome = net.fire(&mut marking, "t", 1).unwrap();
        assert!(!outcome.ok);
        assert!(outcome.out.is_none());
        assert_eq!(marking.as_slice(), &[1, 0, 1]);

        *marking.tokens_mut(PlaceId::new(2)) = 0;
        assert!(!net.guard_check(&marking, "t", 1).unwrap());
        assert!(net.fire(&mut marking, "t", 1).unwrap().ok);
        assert_eq!(marking.as_slice(), &[0, 1, 0]);
    }

    #[test]
    fn guard_threshold_scales_with_multiplier() {
        let mut net = PetriNet::declare("scaled_guard", NetMode::PetriNet, |b| {
            let role = b.role("default");
            let p1 = b.place("p1", 2, 0, Position::default());
            let p2 = b.place("p2", 0, 0, Position::default());
            let brake = b.place("brake", 1, 0, Position::default());
            let t = b.transition("t", &role, Position::default());
            p1.tx(b, 1, &t);
            t.tx(b, 1, &p2);
            brake.guard(b, 1, &t);
        });
        net.index().unwrap();
        let mut marking = net.initial_marking();

        // 封锁门槛是 权重 × 倍数：1 个令牌挡得住 ×1，挡不住 ×2
        assert!(net.guard_check(&marking, "t", 1).unwrap());
        assert!(!net.guard_check(&marking, "t", 2).unwrap());

        assert!(!net.fire(&mut marking, "t", 1).unwrap().ok);
        assert_eq!(marking.as_slice(), &[2, 0, 1]);

        let outcome = net.fire(&mut marking, "t", 2).unwrap();
        assert!(outcome.ok);
        assert_eq!(marking.as_slice(), &[0, 2, 1]);
    }

    #[test]
    fn state_machine_rejects_two_positive_places() {
        let mut net = PetriNet::declare("sm", NetMode::StateMachine, |b| {
            let role = b.role("default");
            let p0 = b.place("p0", 1, 0, Position::default());
            let p1 = b.place("p1", 0, 0, Position::default());
            let p2 = b.place("p2", 0, 0, Position::default());
            let t = b.transition("t", &role, Position::default());
            p0.tx(b, 1, &t);
            t.tx(b, 1, &p1);
            t.tx(b, 1, &p2);
        });
        net.index().unwrap();
        let mut marking = net.initial_marking();
        let outcome = net.fire(&mut marking, "t", 1).unwrap();
        assert!(!outcome.ok);
        assert_eq!(marking.as_slice(), &[1, 0, 0]);
    }

    #[test]
    fn state_machine_caps_token_count_at_one() {
        let mut net = PetriNet::declare("sm2", NetMode::StateMachine, |b| {
            let role = b.role("default");
            let p0 = b.place("p0", 1, 0, Position::default());
            let p1 = b.place("p1", 0, 0, Position::default());
            let t = b.transition("t", &role, Position::default());
            p0.tx(b, 1, &t);
            t.tx(b, 2, &p1);
        });
        net.index().unwrap();
        let mut marking = net.initial_marking();
        assert!(!net.fire(&mut marking, "t", 1).unwrap().ok);
        assert_eq!(marking.as_slice(), &[1, 0]);
    }

    #[test]
    fn workflow_forgives_underflow_by_zeroing() {
        let mut net = PetriNet::declare("wf", NetMode::Workflow, |b| {
            let role = b.role("default");
            let p1 = b.place("p1", 0, 0, Position::default());
            let p2 = b.place("p2", 0, 0, Position::default());
            let t = b.transition("t", &role, Position::default());
            p1.tx(b, 1, &t);
            t.tx(b, 1, &p2);
        });
        net.index().unwrap();
        let mut marking = net.initial_marking();
        let outcome = net.fire(&mut marking, "t", 1).unwrap();
        assert!(outcome.ok);
        assert_eq!(marking.as_slice(), &[0, 1]);
        assert_eq!(
            outcome.out.as_ref().map(|out| out.as_slice()),
            Some([0, 1].as_slice())
        );
    }

    #[test]
    fn workflow_still_rejects_double_marking() {
        let mut net = PetriNet::declare("wf2", NetMode::Workflow, |b| {
            let role = b.role("default");
            let p0 = b.place("p0", 1, 0, Position::default());
            let p1 = b.place("p1", 0, 0, Position::default());
            let p2 = b.place("p2", 0, 0, Position::default());
            let t = b.transition("t", &role, Position::default());
            p0.tx(b, 1, &t);
            t.tx(b, 1, &p1);
            t.tx(b, 1, &p2);
        });
        net.index().unwrap();
        let mut marking = net.initial_marking();
        assert!(!net.fire(&mut marking, "t", 1).unwrap().ok);
        assert_eq!(marking.as_slice(), &[1, 0, 0]);
    }

    #[test]
    fn unknown_action_is_fatal() {
        let net = two_place_net(NetMode::PetriNet);
        let mut marking = net.initial_marking();
        assert!(matches!(
            net.fire(&mut marking, "nope", 1),
            Err(ModelError::UnknownAction(_))
        ));
    }

    #[test]
    fn firing_before_indexing_is_refused() {
        let net = PetriNet::declare("raw", NetMode::PetriNet, |b| {
            let role = b.role("default");
            let p = b.place("p", 1, 0, Position::default());
            let t = b.transition("t", &role, Position::default());
            p.tx(b, 1, &t);
        });
        let mut marking = net.initial_marking();
        assert!(matches!(
            net.fire(&mut marking, "t", 1),
            Err(ModelError::NotIndexed(_))
        ));
    }

    #[test]
    fn zero_multiplier_is_fatal() {
        let net = two_place_net(NetMode::PetriNet);
        let mut marking = net.initial_marking();
        assert!(matches!(
            net.fire(&mut marking, "t", 0),
            Err(ModelError::ZeroMultiplier)
        ));
    }

    #[test]
    fn capacity_overflow_rejects() {
        let mut net = PetriNet::declare("cap", NetMode::PetriNet, |b| {
            let role = b.role("default");
            let p1 = b.place("p1", 2, 0, Position::default());
            let p2 = b.place("p2", 0, 1, Position::default());
            let t = b.transition("t", &role, Position::default());
            p1.tx(b, 1, &t);
            t.tx(b, 1, &p2);
        });
        net.index().unwrap();
        let mut marking = net.initial_marking();
        assert!(net.fire(&mut marking, "t", 1).unwrap().ok);
        let second = net.fire(&mut marking, "t", 1).unwrap();
        assert!(!second.ok);
        assert_eq!(marking.as_slice(), &[1, 1]);
    }

    #[test]
    fn multiplier_scales_the_delta() {
        let mut net = PetriNet::declare("scale", NetMode::PetriNet, |b| {
            let role = b.role("default");
            let p1 = b.place("p1", 6, 0, Position::default());
            let p2 = b.place("p2", 0, 0, Position::default());
            let t = b.transition("t", &role, Position::default());
            p1.tx(b, 2, &t);
            t.tx(b, 1, &p2);
        });
        net.index().unwrap();
        let mut marking = net.initial_marking();
        let outcome = net.fire(&mut marking, "t", 3).unwrap();
        assert!(outcome.ok);
        assert_eq!(marking.as_slice(), &[0, 3]);
    }

    #[test]
    fn enabled_actions_respect_mode_rules() {
        let net = two_place_net(NetMode::PetriNet);
        let marking = net.initial_marking();
        assert_eq!(net.enabled_actions(&marking), vec!["t"]);
        let spent = Marking::from(vec![0, 1]);
        assert!(net.enabled_actions(&spent).is_empty());
    }
}
