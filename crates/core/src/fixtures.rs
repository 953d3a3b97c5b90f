//! Shared C++ snippets for unit tests

/// Class template with a multi-line parameter list and a nested member template
pub(crate) const NESTED_CLASS_TEMPLATE: &str = "\
// Outer class with a nested member template
#include <vector>
template<
    class A,
    class B,
    int N,
    template<class> class TT,
    class C = One,
    class = double
>
class Outer {
public:
    Outer();

    template<class Z>
    struct Inner;
};
";

pub(crate) const OUTER_PREVIEW: &str = "template<A, B, int N, template<_> TT, C = One, _ = double>";

pub(crate) const INNER_PREVIEW: &str = "template<Z>";
