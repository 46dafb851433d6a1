/// Kotlin-style scope function, handy at the end of long method chains.
pub trait LetAlso: Sized {
    /// Passes ownership of `self` into `f` and returns its result.
    fn let_owned<R, F: FnOnce(Self) -> R>(self, f: F) -> R {
        f(self)
    }
}

impl<T> LetAlso for T {}

#[cfg(test)]
mod tests {
    use super::LetAlso;

    #[test]
    fn let_owned_maps_value() {
        assert_eq!(21.let_owned(|x| x * 2), 42);
    }

    #[test]
    fn let_owned_wraps_chain_results() {
        let result: Result<Vec<i32>, ()> = vec![3, 1, 2].let_owned(Ok);
        assert_eq!(result, Ok(vec![3, 1, 2]));
    }
}
