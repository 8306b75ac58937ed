// src/math/expr.rs
/*!
Lazy elementwise expressions.

Every arithmetic operator on an array-like operand returns a small value that
remembers its operands and the operation instead of computing anything. The
value answers one question, `eval(i)`: what is element `i` of the result. A
nested expression such as `(&a + &b) * s - &c` therefore becomes one tree of
plain structs; assigning it into an `Array` or `Lattice` walks the indices once
and writes every element exactly once, with no intermediate buffers.

# Pieces

- [`ArrayExpr`]: the evaluate-element-`i` interface (plus length and the layout
  carried by lattice operands).
- Nodes: [`BinaryExpr`], [`ScalarRhsExpr`], [`ScalarLhsExpr`], [`NegExpr`],
  [`MapExpr`].
- [`Expr`]: the wrapper every node comes back in; it carries the operator
  overloads so expressions compose further.
- Operation markers [`AddOp`], [`SubOp`], [`MulOp`], [`DivOp`].
- `impl_expr_operators!` / `impl_compound_assign!`: generate the operator
  surface for every leaf type (`&Array<T>`, `&Lattice<T>`, views) and for
  `Expr<E>`.

# Semantics

- Binary nodes assert equal lengths at construction.
- Operands bound to two different layouts are rejected at construction.
- Scalars broadcast: `f32`, `f64`, `Complex<R>` on the right; `f32`, `f64`,
  `Complex<f32>`, `Complex<f64>` on the left.
- Division by zero is not checked; the element type decides what happens.
*/

use core::marker::PhantomData;
use core::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use rayon::prelude::*;

use crate::space::layout::Layout;

// ======================================================================================
// ------------------------------------ Interface ---------------------------------------
// ======================================================================================

/// Anything that can produce element `i` of an array on demand.
///
/// Implementors must be `Sync`: materialization evaluates indices from rayon workers.
pub trait ArrayExpr: Sync {
    /// Element produced at each index.
    type Elem: Send;

    /// Number of elements.
    fn size(&self) -> usize;

    /// Element `i`, `i < size()`.
    fn eval(&self, i: usize) -> Self::Elem;

    /// Layout the expression is bound to, if any operand is a full lattice.
    #[inline]
    fn layout(&self) -> Option<&Arc<Layout>> {
        None
    }
}

/// Wrapper carrying the operator overloads of a composed expression.
#[derive(Debug, Clone, Copy)]
pub struct Expr<E>(pub(crate) E);

impl<E: ArrayExpr> Expr<E> {
    /// Lift any expression (e.g. `&lattice`) into an `Expr` to use the combinators.
    #[inline]
    pub fn new(inner: E) -> Self {
        Self(inner)
    }

    #[inline]
    pub fn into_inner(self) -> E {
        self.0
    }

    /// Lazy per-element map.
    #[inline]
    pub fn map<U, F>(self, f: F) -> Expr<MapExpr<E, F>>
    where
        U: Send,
        F: Fn(E::Elem) -> U + Sync,
    {
        Expr(MapExpr { expr: self.0, f })
    }

    /// Materialize into a fresh `Vec`.
    #[inline]
    pub fn to_vec(&self) -> Vec<E::Elem> {
        materialize(&self.0)
    }
}

impl<E: ArrayExpr> ArrayExpr for Expr<E> {
    type Elem = E::Elem;

    #[inline(always)]
    fn size(&self) -> usize {
        self.0.size()
    }

    #[inline(always)]
    fn eval(&self, i: usize) -> Self::Elem {
        self.0.eval(i)
    }

    #[inline(always)]
    fn layout(&self) -> Option<&Arc<Layout>> {
        self.0.layout()
    }
}

// ======================================================================================
// ------------------------------------ Operations --------------------------------------
// ======================================================================================

/// A binary elementwise operation between two element types.
pub trait BinaryOp<A, B> {
    type Output;
    fn apply(a: A, b: B) -> Self::Output;
}

macro_rules! define_binary_op {
    ($name:ident, $trait:ident, $op:tt) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl<A: $trait<B>, B> BinaryOp<A, B> for $name {
            type Output = <A as $trait<B>>::Output;

            #[inline(always)]
            fn apply(a: A, b: B) -> Self::Output {
                a $op b
            }
        }
    };
}

define_binary_op!(AddOp, Add, +);
define_binary_op!(SubOp, Sub, -);
define_binary_op!(MulOp, Mul, *);
define_binary_op!(DivOp, Div, /);

// ======================================================================================
// -------------------------------------- Nodes -----------------------------------------
// ======================================================================================

/// `lhs[i] ∘ rhs[i]`.
#[derive(Debug, Clone, Copy)]
pub struct BinaryExpr<L, R, O> {
    lhs: L,
    rhs: R,
    _op: PhantomData<O>,
}

impl<L: ArrayExpr, R: ArrayExpr, O> BinaryExpr<L, R, O> {
    /// # Panics
    /// - operand lengths differ
    /// - both operands carry a layout and the layouts differ
    #[inline]
    pub fn new(lhs: L, rhs: R) -> Self {
        assert_eq!(
            lhs.size(),
            rhs.size(),
            "expression operands must have equal length"
        );
        check_layouts(lhs.layout(), rhs.layout());
        Self { lhs, rhs, _op: PhantomData }
    }
}

impl<L, R, O> ArrayExpr for BinaryExpr<L, R, O>
where
    L: ArrayExpr,
    R: ArrayExpr,
    O: BinaryOp<L::Elem, R::Elem> + Sync,
    O::Output: Send,
{
    type Elem = O::Output;

    #[inline(always)]
    fn size(&self) -> usize {
        self.lhs.size()
    }

    #[inline(always)]
    fn eval(&self, i: usize) -> Self::Elem {
        O::apply(self.lhs.eval(i), self.rhs.eval(i))
    }

    #[inline]
    fn layout(&self) -> Option<&Arc<Layout>> {
        self.lhs.layout().or_else(|| self.rhs.layout())
    }
}

/// `expr[i] ∘ s`.
#[derive(Debug, Clone, Copy)]
pub struct ScalarRhsExpr<E, S, O> {
    expr: E,
    scalar: S,
    _op: PhantomData<O>,
}

impl<E, S, O> ScalarRhsExpr<E, S, O> {
    #[inline]
    pub fn new(expr: E, scalar: S) -> Self {
        Self { expr, scalar, _op: PhantomData }
    }
}

impl<E, S, O> ArrayExpr for ScalarRhsExpr<E, S, O>
where
    E: ArrayExpr,
    S: Copy + Sync,
    O: BinaryOp<E::Elem, S> + Sync,
    O::Output: Send,
{
    type Elem = O::Output;

    #[inline(always)]
    fn size(&self) -> usize {
        self.expr.size()
    }

    #[inline(always)]
    fn eval(&self, i: usize) -> Self::Elem {
        O::apply(self.expr.eval(i), self.scalar)
    }

    #[inline]
    fn layout(&self) -> Option<&Arc<Layout>> {
        self.expr.layout()
    }
}

/// `s ∘ expr[i]`.
#[derive(Debug, Clone, Copy)]
pub struct ScalarLhsExpr<S, E, O> {
    scalar: S,
    expr: E,
    _op: PhantomData<O>,
}

impl<S, E, O> ScalarLhsExpr<S, E, O> {
    #[inline]
    pub fn new(scalar: S, expr: E) -> Self {
        Self { scalar, expr, _op: PhantomData }
    }
}

impl<S, E, O> ArrayExpr for ScalarLhsExpr<S, E, O>
where
    E: ArrayExpr,
    S: Copy + Sync,
    O: BinaryOp<S, E::Elem> + Sync,
    O::Output: Send,
{
    type Elem = O::Output;

    #[inline(always)]
    fn size(&self) -> usize {
        self.expr.size()
    }

    #[inline(always)]
    fn eval(&self, i: usize) -> Self::Elem {
        O::apply(self.scalar, self.expr.eval(i))
    }

    #[inline]
    fn layout(&self) -> Option<&Arc<Layout>> {
        self.expr.layout()
    }
}

/// `-expr[i]`.
#[derive(Debug, Clone, Copy)]
pub struct NegExpr<E> {
    expr: E,
}

impl<E> NegExpr<E> {
    #[inline]
    pub fn new(expr: E) -> Self {
        Self { expr }
    }
}

impl<E> ArrayExpr for NegExpr<E>
where
    E: ArrayExpr,
    E::Elem: Neg,
    <E::Elem as Neg>::Output: Send,
{
    type Elem = <E::Elem as Neg>::Output;

    #[inline(always)]
    fn size(&self) -> usize {
        self.expr.size()
    }

    #[inline(always)]
    fn eval(&self, i: usize) -> Self::Elem {
        -self.expr.eval(i)
    }

    #[inline]
    fn layout(&self) -> Option<&Arc<Layout>> {
        self.expr.layout()
    }
}

/// `f(expr[i])`.
#[derive(Clone, Copy)]
pub struct MapExpr<E, F> {
    expr: E,
    f: F,
}

impl<E, F, U> ArrayExpr for MapExpr<E, F>
where
    E: ArrayExpr,
    F: Fn(E::Elem) -> U + Sync,
    U: Send,
{
    type Elem = U;

    #[inline(always)]
    fn size(&self) -> usize {
        self.expr.size()
    }

    #[inline(always)]
    fn eval(&self, i: usize) -> U {
        (self.f)(self.expr.eval(i))
    }

    #[inline]
    fn layout(&self) -> Option<&Arc<Layout>> {
        self.expr.layout()
    }
}

// ======================================================================================
// ------------------------------ Materialization Helpers -------------------------------
// ======================================================================================

/// Evaluate every index of `expr` into a new vector (parallel, index order preserved).
#[inline]
pub(crate) fn materialize<E: ArrayExpr>(expr: &E) -> Vec<E::Elem> {
    (0..expr.size()).into_par_iter().map(|i| expr.eval(i)).collect()
}

/// `dst[i] = expr[i]` for every `i`. Caller guarantees equal lengths.
#[inline]
pub(crate) fn par_write<T, E>(dst: &mut [T], expr: &E)
where
    T: Send,
    E: ArrayExpr<Elem = T>,
{
    debug_assert_eq!(dst.len(), expr.size());
    dst.par_iter_mut()
        .enumerate()
        .for_each(|(i, x)| *x = expr.eval(i));
}

/// Destination of an in-place compound assignment.
pub(crate) trait AssignTarget {
    type Elem;

    /// Layout the destination is bound to, if any.
    #[inline]
    fn target_layout(&self) -> Option<&Arc<Layout>> {
        None
    }

    fn target_slice(&mut self) -> &mut [Self::Elem];
}

/// # Panics
/// Panics if both sides are bound to layouts and the layouts differ.
#[inline]
pub(crate) fn check_layouts(dst: Option<&Arc<Layout>>, src: Option<&Arc<Layout>>) {
    if let (Some(a), Some(b)) = (dst, src) {
        assert!(
            Arc::ptr_eq(a, b) || a == b,
            "expression operands are bound to different layouts"
        );
    }
}

/// `f(&mut dst[i], expr[i])` for every `i`.
///
/// # Panics
/// Panics if the lengths differ.
#[inline]
pub(crate) fn par_zip_apply<T, E, F>(dst: &mut [T], expr: &E, f: F)
where
    T: Send,
    E: ArrayExpr,
    F: Fn(&mut T, E::Elem) + Sync,
{
    assert_eq!(
        dst.len(),
        expr.size(),
        "compound assignment: destination and expression lengths differ"
    );
    dst.par_iter_mut()
        .enumerate()
        .for_each(|(i, x)| f(x, expr.eval(i)));
}

/// `f(&mut dst[i])` for every `i`.
#[inline]
pub(crate) fn par_apply<T, F>(dst: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    dst.par_iter_mut().for_each(f);
}

// ======================================================================================
// ---------------------------------- Operator Macros -----------------------------------
// ======================================================================================

/// Operator surface of an expression operand type.
///
/// `impl_expr_operators!([generics] Type)` implements, for `Type: ArrayExpr`:
/// - `+ - * /` against any `ArrayExpr`,
/// - `+ - * /` against `f32`, `f64`, `Complex<R>` on the right,
/// - `+ - *` with `f32`, `f64`, `Complex<f32>`, `Complex<f64>` on the left,
/// - unary `-`.
macro_rules! impl_expr_operators {
    ([$($gen:tt)*] $lhs:ty) => {
        $crate::math::expr::impl_expr_operators!(@binary [$($gen)*] $lhs, Add, add, AddOp);
        $crate::math::expr::impl_expr_operators!(@binary [$($gen)*] $lhs, Sub, sub, SubOp);
        $crate::math::expr::impl_expr_operators!(@binary [$($gen)*] $lhs, Mul, mul, MulOp);
        $crate::math::expr::impl_expr_operators!(@binary [$($gen)*] $lhs, Div, div, DivOp);

        $crate::math::expr::impl_expr_operators!(@rhs_scalar [$($gen)*] $lhs, f32);
        $crate::math::expr::impl_expr_operators!(@rhs_scalar [$($gen)*] $lhs, f64);
        $crate::math::expr::impl_expr_operators!(
            @rhs_scalar [$($gen)*, Re: $crate::math::scalar::Real] $lhs, ::num_complex::Complex<Re>
        );

        $crate::math::expr::impl_expr_operators!(@lhs_scalar [$($gen)*] $lhs, f32);
        $crate::math::expr::impl_expr_operators!(@lhs_scalar [$($gen)*] $lhs, f64);
        $crate::math::expr::impl_expr_operators!(@lhs_scalar [$($gen)*] $lhs, ::num_complex::Complex<f32>);
        $crate::math::expr::impl_expr_operators!(@lhs_scalar [$($gen)*] $lhs, ::num_complex::Complex<f64>);

        impl<$($gen)*> ::core::ops::Neg for $lhs
        where
            $lhs: $crate::math::expr::ArrayExpr,
            $crate::math::expr::NegExpr<$lhs>: $crate::math::expr::ArrayExpr,
        {
            type Output = $crate::math::expr::Expr<$crate::math::expr::NegExpr<$lhs>>;

            #[inline]
            fn neg(self) -> Self::Output {
                $crate::math::expr::Expr($crate::math::expr::NegExpr::new(self))
            }
        }
    };

    (@binary [$($gen:tt)*] $lhs:ty, $trait:ident, $method:ident, $op:ident) => {
        impl<$($gen)*, Rhs> ::core::ops::$trait<Rhs> for $lhs
        where
            $lhs: $crate::math::expr::ArrayExpr,
            Rhs: $crate::math::expr::ArrayExpr,
            $crate::math::expr::BinaryExpr<$lhs, Rhs, $crate::math::expr::$op>:
                $crate::math::expr::ArrayExpr,
        {
            type Output = $crate::math::expr::Expr<
                $crate::math::expr::BinaryExpr<$lhs, Rhs, $crate::math::expr::$op>,
            >;

            #[inline]
            fn $method(self, rhs: Rhs) -> Self::Output {
                $crate::math::expr::Expr($crate::math::expr::BinaryExpr::new(self, rhs))
            }
        }
    };

    (@rhs_scalar [$($gen:tt)*] $lhs:ty, $s:ty) => {
        $crate::math::expr::impl_expr_operators!(@rhs_scalar_op [$($gen)*] $lhs, $s, Add, add, AddOp);
        $crate::math::expr::impl_expr_operators!(@rhs_scalar_op [$($gen)*] $lhs, $s, Sub, sub, SubOp);
        $crate::math::expr::impl_expr_operators!(@rhs_scalar_op [$($gen)*] $lhs, $s, Mul, mul, MulOp);
        $crate::math::expr::impl_expr_operators!(@rhs_scalar_op [$($gen)*] $lhs, $s, Div, div, DivOp);
    };

    (@rhs_scalar_op [$($gen:tt)*] $lhs:ty, $s:ty, $trait:ident, $method:ident, $op:ident) => {
        impl<$($gen)*> ::core::ops::$trait<$s> for $lhs
        where
            $lhs: $crate::math::expr::ArrayExpr,
            $crate::math::expr::ScalarRhsExpr<$lhs, $s, $crate::math::expr::$op>:
                $crate::math::expr::ArrayExpr,
        {
            type Output = $crate::math::expr::Expr<
                $crate::math::expr::ScalarRhsExpr<$lhs, $s, $crate::math::expr::$op>,
            >;

            #[inline]
            fn $method(self, s: $s) -> Self::Output {
                $crate::math::expr::Expr($crate::math::expr::ScalarRhsExpr::new(self, s))
            }
        }
    };

    (@lhs_scalar [$($gen:tt)*] $lhs:ty, $s:ty) => {
        $crate::math::expr::impl_expr_operators!(@lhs_scalar_op [$($gen)*] $lhs, $s, Add, add, AddOp);
        $crate::math::expr::impl_expr_operators!(@lhs_scalar_op [$($gen)*] $lhs, $s, Sub, sub, SubOp);
        $crate::math::expr::impl_expr_operators!(@lhs_scalar_op [$($gen)*] $lhs, $s, Mul, mul, MulOp);
    };

    (@lhs_scalar_op [$($gen:tt)*] $rhs:ty, $s:ty, $trait:ident, $method:ident, $op:ident) => {
        impl<$($gen)*> ::core::ops::$trait<$rhs> for $s
        where
            $rhs: $crate::math::expr::ArrayExpr,
            $crate::math::expr::ScalarLhsExpr<$s, $rhs, $crate::math::expr::$op>:
                $crate::math::expr::ArrayExpr,
        {
            type Output = $crate::math::expr::Expr<
                $crate::math::expr::ScalarLhsExpr<$s, $rhs, $crate::math::expr::$op>,
            >;

            #[inline]
            fn $method(self, rhs: $rhs) -> Self::Output {
                $crate::math::expr::Expr($crate::math::expr::ScalarLhsExpr::new(self, rhs))
            }
        }
    };
}
pub(crate) use impl_expr_operators;

/// In-place `+= -= *= /=` for an [`AssignTarget`] destination.
///
/// `impl_compound_assign!([generics] Dest, Elem)` accepts any `ArrayExpr` of
/// matching length, or a broadcast `f32`, `f64`, `Complex<R>`.
macro_rules! impl_compound_assign {
    ([$($gen:tt)*] $dst:ty, $elem:ty) => {
        $crate::math::expr::impl_compound_assign!(@expr [$($gen)*] $dst, $elem, AddAssign, add_assign);
        $crate::math::expr::impl_compound_assign!(@expr [$($gen)*] $dst, $elem, SubAssign, sub_assign);
        $crate::math::expr::impl_compound_assign!(@expr [$($gen)*] $dst, $elem, MulAssign, mul_assign);
        $crate::math::expr::impl_compound_assign!(@expr [$($gen)*] $dst, $elem, DivAssign, div_assign);

        $crate::math::expr::impl_compound_assign!(@scalar [$($gen)*] $dst, $elem, f32);
        $crate::math::expr::impl_compound_assign!(@scalar [$($gen)*] $dst, $elem, f64);
        $crate::math::expr::impl_compound_assign!(
            @scalar [$($gen)*, Re: $crate::math::scalar::Real] $dst, $elem, ::num_complex::Complex<Re>
        );
    };

    (@expr [$($gen:tt)*] $dst:ty, $elem:ty, $trait:ident, $method:ident) => {
        impl<$($gen)*, Rhs> ::core::ops::$trait<Rhs> for $dst
        where
            Rhs: $crate::math::expr::ArrayExpr,
            $elem: ::core::ops::$trait<Rhs::Elem> + Send,
        {
            #[inline]
            fn $method(&mut self, rhs: Rhs) {
                use $crate::math::expr::AssignTarget;
                $crate::math::expr::check_layouts(self.target_layout(), rhs.layout());
                $crate::math::expr::par_zip_apply(self.target_slice(), &rhs, |x, y| {
                    ::core::ops::$trait::$method(x, y)
                });
            }
        }
    };

    (@scalar [$($gen:tt)*] $dst:ty, $elem:ty, $s:ty) => {
        $crate::math::expr::impl_compound_assign!(@scalar_op [$($gen)*] $dst, $elem, $s, AddAssign, add_assign);
        $crate::math::expr::impl_compound_assign!(@scalar_op [$($gen)*] $dst, $elem, $s, SubAssign, sub_assign);
        $crate::math::expr::impl_compound_assign!(@scalar_op [$($gen)*] $dst, $elem, $s, MulAssign, mul_assign);
        $crate::math::expr::impl_compound_assign!(@scalar_op [$($gen)*] $dst, $elem, $s, DivAssign, div_assign);
    };

    (@scalar_op [$($gen:tt)*] $dst:ty, $elem:ty, $s:ty, $trait:ident, $method:ident) => {
        impl<$($gen)*> ::core::ops::$trait<$s> for $dst
        where
            $elem: ::core::ops::$trait<$s> + Send,
        {
            #[inline]
            fn $method(&mut self, s: $s) {
                use $crate::math::expr::AssignTarget;
                $crate::math::expr::par_apply(self.target_slice(), |x| {
                    ::core::ops::$trait::$method(x, s)
                });
            }
        }
    };
}
pub(crate) use impl_compound_assign;

impl_expr_operators!([E] Expr<E>);
