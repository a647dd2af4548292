use core::hash::Hash;

/// The surface that owns the resources (views, cells, widgets) items are rendered into.
///
/// The engine decides which items are in the window and which resource shows which item; the
/// host does the actual work. Calls arrive from whichever thread runs the recompute, one at a
/// time.
pub trait ResourceHost<P> {
    /// Resources are only recycled between items of the same kind.
    type Kind: Hash + Eq + Clone;
    type Resource;

    fn kind_of(&self, payload: &P) -> Self::Kind;

    fn create_resource(&mut self, kind: &Self::Kind) -> Self::Resource;

    /// Points `resource` at a (new) payload.
    fn bind_payload(&mut self, resource: &mut Self::Resource, payload: &P);

    /// Moves `resource` to `offset` along the scroll axis.
    fn place(&mut self, resource: &mut Self::Resource, offset: u64);

    fn show(&mut self, resource: &mut Self::Resource);

    fn hide(&mut self, resource: &mut Self::Resource);

    /// Called for items that stay in the window across a recompute.
    fn refresh(&mut self, resource: &mut Self::Resource, payload: &P) {
        let _ = (resource, payload);
    }
}
