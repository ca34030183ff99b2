use std::fmt;

// 哲学者の番号。i 番目の哲学者は箸 i と箸 (i + 1) % n を使う
pub type ActorId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    Thinking,
    Hungry,
    Eating,
}

impl ActorState {
    // Thinking -> Hungry -> Eating -> Thinking の順にしか遷移しない
    pub fn next(self) -> Self {
        match self {
            ActorState::Thinking => ActorState::Hungry,
            ActorState::Hungry => ActorState::Eating,
            ActorState::Eating => ActorState::Thinking,
        }
    }
}

impl fmt::Display for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActorState::Thinking => "THINKING",
            ActorState::Hungry => "HUNGRY",
            ActorState::Eating => "EATING",
        };
        f.write_str(s)
    }
}

// モニタのロック下でのみ触る共有状態
#[derive(Debug)]
pub(crate) struct Table {
    states: Vec<ActorState>,
    // 待機中にキャンセルされて席を立った哲学者。以降は箸を割り当てない
    departed: Vec<bool>,
}

impl Table {
    pub(crate) fn new(n: usize) -> Self {
        assert!(n >= 2, "a table needs at least two diners, got {n}");
        Table {
            states: vec![ActorState::Thinking; n],
            departed: vec![false; n],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn left(&self, i: ActorId) -> ActorId {
        (i + self.len() - 1) % self.len()
    }

    pub(crate) fn right(&self, i: ActorId) -> ActorId {
        (i + 1) % self.len()
    }

    pub(crate) fn state(&self, i: ActorId) -> ActorState {
        self.states[i]
    }

    pub(crate) fn states(&self) -> &[ActorState] {
        &self.states
    }

    pub(crate) fn is_departed(&self, i: ActorId) -> bool {
        self.departed[i]
    }

    pub(crate) fn depart(&mut self, i: ActorId) {
        self.departed[i] = true;
    }

    // 状態遷移は一つ先に進めるだけ。飛ばしたり戻したりはしない
    pub(crate) fn advance(&mut self, i: ActorId, to: ActorState) {
        assert_eq!(
            self.states[i].next(),
            to,
            "philosopher {i} cannot go from {} to {to}",
            self.states[i]
        );
        self.states[i] = to;
    }

    // 左右の哲学者が食事中でなく、自分が空腹なら両方の箸が空いている
    pub(crate) fn can_eat(&self, i: ActorId) -> bool {
        !self.departed[i]
            && self.states[self.left(i)] != ActorState::Eating
            && self.states[i] == ActorState::Hungry
            && self.states[self.right(i)] != ActorState::Eating
    }

    // 箸を割り当てられたら Eating にして true を返す
    pub(crate) fn grant(&mut self, i: ActorId) -> bool {
        if self.can_eat(i) {
            self.advance(i, ActorState::Eating);
            true
        } else {
            false
        }
    }
}
