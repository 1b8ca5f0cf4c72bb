use std::num::NonZeroUsize;

/// Unique id to identify a class in the repo
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct ClassUid(NonZeroUsize);

impl ClassUid {
    #[inline]
    #[must_use]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

#[derive(Debug, Default)]
pub struct RepoCounters {
    nb_classes: usize,
    nb_methods: usize,
}

impl RepoCounters {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn new_class_uid(&mut self) -> ClassUid {
        self.nb_classes += 1;
        ClassUid(NonZeroUsize::new(self.nb_classes).expect("just incremented, cannot be 0"))
    }

    pub(crate) fn count_methods(&mut self, nb: usize) {
        self.nb_methods += nb;
    }

    pub(crate) fn nb_classes(&self) -> usize {
        self.nb_classes
    }

    pub(crate) fn nb_methods(&self) -> usize {
        self.nb_methods
    }
}
