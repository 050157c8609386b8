use slotmap::new_key_type;

new_key_type! {
    /// Stable handle of an atom inside a [`MolecularSystem`](super::system::MolecularSystem).
    pub struct AtomId;
    pub struct ResidueId;
    pub struct ChainId;
}
