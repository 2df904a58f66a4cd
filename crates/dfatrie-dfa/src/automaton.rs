use std::path::Path;

use serde::Deserialize;

use crate::error::DfaError;

/// One transition over an inclusive byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub begin: u8,
    pub end: u8,
    pub to: usize,
}

impl Transition {
    pub fn bytes(&self) -> impl Iterator<Item = u8> {
        self.begin..=self.end
    }

    pub fn width(&self) -> u64 {
        u64::from(self.end - self.begin) + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub accepting: bool,
    /// Sorted by `begin`, non-overlapping.
    transitions: Vec<Transition>,
    /// Target of the state when all 256 bytes lead to the same place.
    any_byte: Option<usize>,
}

impl State {
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn any_byte(&self) -> Option<usize> {
        self.any_byte
    }
}

/// The decoder automaton. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    states: Vec<State>,
    initial: usize,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAutomaton {
    initial: usize,
    states: Vec<RawState>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawState {
    #[serde(default)]
    accepting: bool,
    #[serde(default)]
    transitions: Vec<RawTransition>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTransition {
    begin: u8,
    /// Defaults to `begin` for single-byte transitions.
    #[serde(default)]
    end: Option<u8>,
    to: usize,
}

impl Automaton {
    /// Builds an automaton from `(accepting, transitions)` pairs and checks that it is well
    /// formed: targets in range, no overlapping ranges, an accepting initial state that does not
    /// match any byte.
    pub fn new(
        states: Vec<(bool, Vec<Transition>)>,
        initial: usize,
    ) -> Result<Automaton, DfaError> {
        if states.is_empty() {
            return Err(DfaError::NoStates);
        }
        if initial >= states.len() {
            return Err(DfaError::InitialOutOfRange {
                initial,
                states: states.len(),
            });
        }

        let count = states.len();
        let mut built = Vec::with_capacity(count);
        for (index, (accepting, mut transitions)) in states.into_iter().enumerate() {
            transitions.sort_by_key(|t| t.begin);
            let mut next_free: u16 = 0;
            for t in &transitions {
                if t.begin > t.end {
                    return Err(DfaError::EmptyRange {
                        state: index,
                        begin: t.begin,
                        end: t.end,
                    });
                }
                if t.to >= count {
                    return Err(DfaError::TransitionOutOfRange {
                        state: index,
                        to: t.to,
                    });
                }
                if u16::from(t.begin) < next_free {
                    return Err(DfaError::OverlappingTransitions {
                        state: index,
                        byte: t.begin,
                    });
                }
                next_free = u16::from(t.end) + 1;
            }
            let any_byte = any_byte_target(&transitions);
            built.push(State {
                accepting,
                transitions,
                any_byte,
            });
        }

        let automaton = Automaton {
            states: built,
            initial,
        };
        let start = automaton.initial_state();
        if !start.accepting {
            return Err(DfaError::InitialNotAccepting);
        }
        if start.any_byte.is_some() {
            return Err(DfaError::InitialAnyByte);
        }
        Ok(automaton)
    }

    pub fn from_json(text: &str) -> Result<Automaton, DfaError> {
        let raw: RawAutomaton = serde_json::from_str(text)?;
        let states = raw
            .states
            .into_iter()
            .map(|s| {
                let transitions = s
                    .transitions
                    .into_iter()
                    .map(|t| Transition {
                        begin: t.begin,
                        end: t.end.unwrap_or(t.begin),
                        to: t.to,
                    })
                    .collect();
                (s.accepting, transitions)
            })
            .collect();
        Automaton::new(states, raw.initial)
    }

    pub fn load(path: &Path) -> Result<Automaton, DfaError> {
        let text = std::fs::read_to_string(path)?;
        let automaton = Automaton::from_json(&text)?;
        tracing::debug!(
            path = %path.display(),
            states = automaton.states.len(),
            "loaded decoder automaton"
        );
        Ok(automaton)
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }

    pub fn initial(&self) -> usize {
        self.initial
    }

    pub fn initial_state(&self) -> &State {
        &self.states[self.initial]
    }

    /// Number of distinct candidate suffixes emitted by a traversal starting at each state.
    ///
    /// Accepting states end a candidate (count 1), any-byte states contribute one representative
    /// byte, everything else sums over its transitions. Fails if some non-accepting cycle would
    /// make the traversal infinite.
    pub fn suffix_counts(&self) -> Result<Vec<u64>, DfaError> {
        let mut counts: Vec<Option<u64>> = vec![None; self.states.len()];
        let mut on_stack = vec![false; self.states.len()];
        for state in 0..self.states.len() {
            self.count_suffixes(state, &mut counts, &mut on_stack)?;
        }
        Ok(counts.into_iter().map(|c| c.unwrap_or(0)).collect())
    }

    fn count_suffixes(
        &self,
        state: usize,
        counts: &mut [Option<u64>],
        on_stack: &mut [bool],
    ) -> Result<u64, DfaError> {
        if let Some(count) = counts[state] {
            return Ok(count);
        }
        let node = &self.states[state];
        if node.accepting {
            counts[state] = Some(1);
            return Ok(1);
        }
        if on_stack[state] {
            return Err(DfaError::Cycle { state });
        }
        on_stack[state] = true;
        let count = match node.any_byte {
            Some(to) => self.count_suffixes(to, counts, on_stack)?,
            None => {
                let mut total: u64 = 0;
                for t in &node.transitions {
                    let per_byte = self.count_suffixes(t.to, counts, on_stack)?;
                    total = per_byte
                        .checked_mul(t.width())
                        .and_then(|n| total.checked_add(n))
                        .ok_or(DfaError::SuffixCountOverflow { state })?;
                }
                total
            }
        };
        on_stack[state] = false;
        counts[state] = Some(count);
        Ok(count)
    }

    /// Total number of candidate instructions a full traversal will emit, computed without
    /// enumerating them.
    pub fn expected_instructions(&self) -> Result<u64, DfaError> {
        let counts = self.suffix_counts()?;
        let mut total: u64 = 0;
        for t in &self.initial_state().transitions {
            total = counts[t.to]
                .checked_mul(t.width())
                .and_then(|n| total.checked_add(n))
                .ok_or(DfaError::SuffixCountOverflow {
                    state: self.initial,
                })?;
        }
        Ok(total)
    }
}

fn any_byte_target(transitions: &[Transition]) -> Option<usize> {
    let first = transitions.first()?;
    let mut expected_begin: u16 = 0;
    for t in transitions {
        if t.to != first.to || u16::from(t.begin) != expected_begin {
            return None;
        }
        expected_begin = u16::from(t.end) + 1;
    }
    (expected_begin == 256).then_some(first.to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(begin: u8, end: u8, to: usize) -> Transition {
        Transition { begin, end, to }
    }

    #[test]
    fn parses_json_with_single_byte_shorthand() {
        let dfa = Automaton::from_json(
            r#"{
                "initial": 0,
                "states": [
                    {"accepting": true, "transitions": [{"begin": 144, "to": 0}, {"begin": 15, "to": 1}]},
                    {"transitions": [{"begin": 0, "end": 255, "to": 0}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(dfa.states().len(), 2);
        assert_eq!(dfa.initial_state().transitions()[0], t(0x0f, 0x0f, 1));
        assert_eq!(dfa.state(1).unwrap().any_byte(), Some(0));
        assert_eq!(dfa.expected_instructions().unwrap(), 2);
    }

    #[test]
    fn rejects_malformed_models() {
        assert!(matches!(Automaton::new(vec![], 0), Err(DfaError::NoStates)));
        assert!(matches!(
            Automaton::new(vec![(true, vec![])], 3),
            Err(DfaError::InitialOutOfRange { .. })
        ));
        assert!(matches!(
            Automaton::new(vec![(false, vec![])], 0),
            Err(DfaError::InitialNotAccepting)
        ));
        assert!(matches!(
            Automaton::new(vec![(true, vec![t(0, 255, 0)])], 0),
            Err(DfaError::InitialAnyByte)
        ));
        assert!(matches!(
            Automaton::new(vec![(true, vec![t(1, 4, 0), t(4, 6, 0)])], 0),
            Err(DfaError::OverlappingTransitions { byte: 4, .. })
        ));
        assert!(matches!(
            Automaton::new(vec![(true, vec![t(1, 1, 9)])], 0),
            Err(DfaError::TransitionOutOfRange { to: 9, .. })
        ));
        assert!(matches!(
            Automaton::new(vec![(true, vec![t(5, 1, 0)])], 0),
            Err(DfaError::EmptyRange { .. })
        ));
        assert!(matches!(
            Automaton::from_json(r#"{"initial": 0, "states": [], "extra": 1}"#),
            Err(DfaError::Json(_))
        ));
    }

    #[test]
    fn any_byte_requires_full_coverage_and_single_target() {
        assert_eq!(any_byte_target(&[t(0, 127, 2), t(128, 255, 2)]), Some(2));
        assert_eq!(any_byte_target(&[t(0, 127, 2), t(128, 255, 3)]), None);
        assert_eq!(any_byte_target(&[t(0, 254, 2)]), None);
        assert_eq!(any_byte_target(&[]), None);
    }

    #[test]
    fn suffix_counts_multiply_ranges() {
        // 0: start/accept. 0x40..=0x4f -> 1, 0x90 -> 0.
        // 1: 0x00..=0x03 -> 2 (imm8) , 0x89 -> 0
        // 2: any byte -> 0
        let dfa = Automaton::new(
            vec![
                (true, vec![t(0x40, 0x4f, 1), t(0x90, 0x90, 0)]),
                (false, vec![t(0x00, 0x03, 2), t(0x89, 0x89, 0)]),
                (false, vec![t(0x00, 0xff, 0)]),
            ],
            0,
        )
        .unwrap();
        assert_eq!(dfa.suffix_counts().unwrap(), vec![1, 5, 1]);
        assert_eq!(dfa.expected_instructions().unwrap(), 16 * 5 + 1);
    }

    #[test]
    fn non_accepting_cycles_are_rejected() {
        let dfa = Automaton::new(
            vec![
                (true, vec![t(0x01, 0x01, 1)]),
                (false, vec![t(0x02, 0x02, 2)]),
                (false, vec![t(0x03, 0x03, 1)]),
            ],
            0,
        )
        .unwrap();
        assert!(matches!(dfa.suffix_counts(), Err(DfaError::Cycle { .. })));
    }
}
