use dfatrie_types::AcceptInfo;

use crate::cache::NodeCache;
use crate::node::NodeId;

/// Walks two tries of the same cache in lockstep and reports every sequence on which they
/// disagree, either on acceptance or on accept info.
///
/// Identical subtries share a node id and are skipped without being visited, which keeps the
/// walk proportional to the difference rather than to the size of either language.
pub fn diff_tries<F, E>(cache: &NodeCache, a: NodeId, b: NodeId, mut callback: F) -> Result<(), E>
where
    F: FnMut(&[u8], Option<&AcceptInfo>, Option<&AcceptInfo>) -> Result<(), E>,
{
    let mut path = Vec::new();
    diff_at(cache, a, b, &mut path, &mut callback)
}

fn diff_at<F, E>(
    cache: &NodeCache,
    a: NodeId,
    b: NodeId,
    path: &mut Vec<u8>,
    callback: &mut F,
) -> Result<(), E>
where
    F: FnMut(&[u8], Option<&AcceptInfo>, Option<&AcceptInfo>) -> Result<(), E>,
{
    if a == b {
        return Ok(());
    }
    let (left, right) = (cache.node(a), cache.node(b));
    if left.accept() != right.accept() {
        callback(path, left.accept(), right.accept())?;
    }

    let (lc, rc) = (left.children(), right.children());
    let empty = cache.empty();
    let (mut i, mut j) = (0, 0);
    while i < lc.len() || j < rc.len() {
        let (byte, ca, cb) = match (lc.get(i), rc.get(j)) {
            (Some(&(ba, ca)), Some(&(bb, cb))) if ba == bb => {
                i += 1;
                j += 1;
                (ba, ca, cb)
            }
            (Some(&(ba, ca)), Some(&(bb, _))) if ba < bb => {
                i += 1;
                (ba, ca, empty)
            }
            (Some(&(ba, ca)), None) => {
                i += 1;
                (ba, ca, empty)
            }
            (_, Some(&(bb, cb))) => {
                j += 1;
                (bb, empty, cb)
            }
            (None, None) => unreachable!(),
        };
        path.push(byte);
        diff_at(cache, ca, cb, path, callback)?;
        path.pop();
    }
    Ok(())
}
