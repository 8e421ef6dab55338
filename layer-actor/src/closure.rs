//! Method calls bound to their arguments.
//!
//! An [`ImmediateClosure`] keeps the arguments as given, borrowed ones
//! included, and runs on the caller's stack. A [`DelayedClosure`] owns
//! everything it needs and can cross into an actor's mailbox.

// ─── ImmediateClosure ─────────────────────────────────────────────────────────

pub struct ImmediateClosure<A, Args> {
    method: fn(&mut A, Args),
    args:   Args,
}

impl<A, Args> ImmediateClosure<A, Args> {
    pub fn run(self, actor: &mut A) {
        (self.method)(actor, self.args);
    }

    /// Moves the call into owned storage for later delivery.
    pub fn delay(self) -> DelayedClosure<A>
    where
        A: 'static,
        Args: Send + 'static,
    {
        let Self { method, args } = self;
        DelayedClosure::new(move |actor: &mut A| method(actor, args))
    }
}

impl<A, Args> std::fmt::Debug for ImmediateClosure<A, Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ImmediateClosure")
    }
}

// ─── DelayedClosure ───────────────────────────────────────────────────────────

pub struct DelayedClosure<A> {
    call: Box<dyn FnOnce(&mut A) + Send>,
}

impl<A> DelayedClosure<A> {
    pub fn new(call: impl FnOnce(&mut A) + Send + 'static) -> Self {
        Self { call: Box::new(call) }
    }

    pub fn run(self, actor: &mut A) {
        (self.call)(actor);
    }
}

impl<A> std::fmt::Debug for DelayedClosure<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DelayedClosure")
    }
}

pub fn create_immediate_closure<A, Args>(method: fn(&mut A, Args), args: Args) -> ImmediateClosure<A, Args> {
    ImmediateClosure { method, args }
}

pub fn create_delayed_closure<A: 'static, Args: Send + 'static>(
    method: fn(&mut A, Args),
    args: Args,
) -> DelayedClosure<A> {
    create_immediate_closure(method, args).delay()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Journal {
        lines: Vec<String>,
    }

    impl Journal {
        fn note(&mut self, (prefix, n): (&str, i32)) {
            self.lines.push(format!("{prefix}{n}"));
        }

        fn note_owned(&mut self, (prefix, n): (String, i32)) {
            self.lines.push(format!("{prefix}{n}"));
        }
    }

    #[test]
    fn immediate_borrows() {
        let prefix = String::from("item ");
        let mut journal = Journal::default();
        create_immediate_closure(Journal::note, (prefix.as_str(), 1)).run(&mut journal);
        assert_eq!(journal.lines, ["item 1"]);
    }

    #[test]
    fn delayed_owns() {
        let closure = {
            let prefix = String::from("later ");
            create_delayed_closure(Journal::note_owned, (prefix, 2))
        };
        let mut journal = Journal::default();
        closure.run(&mut journal);
        DelayedClosure::new(|j: &mut Journal| j.lines.clear()).run(&mut journal);
        assert!(journal.lines.is_empty());
    }
}
