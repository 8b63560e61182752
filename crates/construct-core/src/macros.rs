//! Ergonomic declaration sugar over [`crate::constructs::Struct`].

/// Builds a [`crate::constructs::Struct`] from a field list without the
/// repeated `as ConstructRef` casts a direct `Struct::new(vec![...])` call
/// needs:
///
/// ```ignore
/// let header = cstruct! {
///     "signature" => Const::new(b"BMP".to_vec()),
///     "width" => Integer::new(1),
///     "height" => Integer::new(1),
/// };
/// ```
#[macro_export]
macro_rules! cstruct {
    ($($name:literal => $construct:expr),* $(,)?) => {
        $crate::constructs::Struct::new(vec![
            $(
                ($name, ::std::sync::Arc::new($construct) as $crate::construct::ConstructRef),
            )*
        ])
    };
}
