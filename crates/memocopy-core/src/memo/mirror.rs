use super::{Checkpoint, Memo};
use crate::value::Identity;

/// Dict-flavoured twin of a native memo
///
/// Hooks that reject the native memo are handed the mirror instead. The
/// two are kept in step incrementally: before a hook runs the mirror pulls
/// what the native memo gained, afterwards the native memo pulls what the
/// hook registered. First registration wins in both directions.
pub(crate) struct MirrorLink {
    native: Identity,
    mirror: Memo,
    native_seen: Checkpoint,
    mirror_seen: Checkpoint,
}

impl MirrorLink {
    pub(crate) fn open(native: &Memo) -> Self {
        let mut link = Self {
            native: native.identity(),
            mirror: Memo::new(),
            native_seen: Checkpoint::START,
            mirror_seen: Checkpoint::START,
        };
        link.pull(native);
        link
    }

    pub(crate) fn serves(&self, native: &Memo) -> bool {
        self.native == native.identity()
    }

    pub(crate) fn memo(&self) -> &Memo {
        &self.mirror
    }

    /// Copy what the native memo gained since the last sync into the mirror
    pub(crate) fn pull(&mut self, native: &Memo) {
        let (entries, kept, upto) = native.changes_since(self.native_seen);
        for (identity, clone) in entries {
            self.mirror.insert_if_absent(identity, clone);
        }
        for original in kept {
            self.mirror.keep_alive(original);
        }
        self.native_seen = upto;
        self.mirror_seen = self.mirror.checkpoint();
    }

    /// Copy what the hook registered in the mirror back into the native memo
    pub(crate) fn push(&mut self, native: &Memo) {
        let (entries, kept, upto) = self.mirror.changes_since(self.mirror_seen);
        for (identity, clone) in entries {
            native.insert_if_absent(identity, clone);
        }
        for original in kept {
            native.keep_alive(original);
        }
        self.mirror_seen = upto;
        self.native_seen = native.checkpoint();
    }
}
