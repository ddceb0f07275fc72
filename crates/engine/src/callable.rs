//! Adaptors from typed user closures to type-erased node kernels.
//!
//! Closures are written with concrete argument types (`|x: i64, y: f64| ...`).
//! The traits below are implemented for every closure arity up to six, so the
//! graph can store them behind one erased signature taking `Vec<Value>` and
//! the resolver can read the pinned argument types at booking time.

use rowflow_core::{ColumnType, DataType, Value};

/// A value handed to a closure argument did not have the declared type.
#[doc(hidden)]
#[derive(Clone, Debug, PartialEq)]
pub struct Conversion {
    pub(crate) index: usize,
    pub(crate) expected: Option<DataType>,
    pub(crate) got: Option<DataType>,
}

impl Conversion {
    fn missing(index: usize, expected: Option<DataType>) -> Self {
        Self {
            index,
            expected,
            got: None,
        }
    }
}

/// A closure over column values returning `R`.
pub trait ColumnFn<Args, R>: Send + Sync + 'static {
    /// Pinned types of the arguments, in order.
    fn arg_types() -> Vec<Option<DataType>>;

    #[doc(hidden)]
    fn call_values(&self, args: Vec<Value>) -> Result<R, Conversion>;
}

/// A closure taking the processing slot followed by column values.
pub trait SlotFn<Args>: Send + Sync + 'static {
    /// Pinned types of the column arguments, in order.
    fn arg_types() -> Vec<Option<DataType>>;

    #[doc(hidden)]
    fn call_values(&self, slot: usize, args: Vec<Value>) -> Result<(), Conversion>;
}

/// A closure updating an accumulator from column values.
pub trait AccumulateFn<Acc, Args>: Send + Sync + 'static {
    /// Pinned types of the column arguments, in order.
    fn arg_types() -> Vec<Option<DataType>>;

    #[doc(hidden)]
    fn call_values(&self, acc: &mut Acc, args: Vec<Value>) -> Result<(), Conversion>;
}

fn take_arg<T: ColumnType>(
    iter: &mut impl Iterator<Item = (usize, Value)>,
    index: usize,
) -> Result<T, Conversion> {
    let (_, value) = iter
        .next()
        .ok_or_else(|| Conversion::missing(index, T::pinned_type()))?;
    T::from_value(value).map_err(|v| Conversion {
        index,
        expected: T::pinned_type(),
        got: v.data_type(),
    })
}

macro_rules! impl_callables {
    ($($ty:ident $var:ident $idx:tt),*) => {
        impl<Func, Ret, $($ty,)*> ColumnFn<($($ty,)*), Ret> for Func
        where
            Func: Fn($($ty),*) -> Ret + Send + Sync + 'static,
            $($ty: ColumnType,)*
        {
            fn arg_types() -> Vec<Option<DataType>> {
                vec![$($ty::pinned_type()),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn call_values(&self, args: Vec<Value>) -> Result<Ret, Conversion> {
                let mut iter = args.into_iter().enumerate();
                $(let $var = take_arg::<$ty>(&mut iter, $idx)?;)*
                Ok(self($($var),*))
            }
        }

        impl<Func, $($ty,)*> SlotFn<($($ty,)*)> for Func
        where
            Func: Fn(usize $(, $ty)*) + Send + Sync + 'static,
            $($ty: ColumnType,)*
        {
            fn arg_types() -> Vec<Option<DataType>> {
                vec![$($ty::pinned_type()),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn call_values(&self, slot: usize, args: Vec<Value>) -> Result<(), Conversion> {
                let mut iter = args.into_iter().enumerate();
                $(let $var = take_arg::<$ty>(&mut iter, $idx)?;)*
                self(slot $(, $var)*);
                Ok(())
            }
        }

        impl<Func, Acc, $($ty,)*> AccumulateFn<Acc, ($($ty,)*)> for Func
        where
            Func: Fn(&mut Acc $(, $ty)*) + Send + Sync + 'static,
            $($ty: ColumnType,)*
        {
            fn arg_types() -> Vec<Option<DataType>> {
                vec![$($ty::pinned_type()),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn call_values(&self, acc: &mut Acc, args: Vec<Value>) -> Result<(), Conversion> {
                let mut iter = args.into_iter().enumerate();
                $(let $var = take_arg::<$ty>(&mut iter, $idx)?;)*
                self(acc $(, $var)*);
                Ok(())
            }
        }
    };
}

impl_callables!();
impl_callables!(A a 0);
impl_callables!(A a 0, B b 1);
impl_callables!(A a 0, B b 1, C c 2);
impl_callables!(A a 0, B b 1, C c 2, D d 3);
impl_callables!(A a 0, B b 1, C c 2, D d 3, E e 4);
impl_callables!(A a 0, B b 1, C c 2, D d 3, E e 4, G g 5);

#[cfg(test)]
mod tests {
    use super::*;

    fn arity<F: ColumnFn<Args, R>, Args, R>(_: &F) -> usize {
        F::arg_types().len()
    }

    fn types<F: ColumnFn<Args, R>, Args, R>(_: &F) -> Vec<Option<DataType>> {
        F::arg_types()
    }

    fn call<F: ColumnFn<Args, R>, Args, R>(f: &F, args: Vec<Value>) -> Result<R, Conversion> {
        f.call_values(args)
    }

    #[test]
    fn test_column_fn_arity_and_types() {
        let f = |x: i64, y: f64| x as f64 + y;
        assert_eq!(arity(&f), 2);
        assert_eq!(types(&f), vec![Some(DataType::Int64), Some(DataType::Float64)]);
        let g = || true;
        assert_eq!(arity(&g), 0);
    }

    #[test]
    fn test_column_fn_call() {
        let f = |x: i64, y: f64| x as f64 + y;
        assert_eq!(call(&f, vec![Value::Int64(2), Value::Float64(0.5)]), Ok(2.5));
    }

    #[test]
    fn test_column_fn_conversion_error() {
        let f = |x: i64| x % 2 == 0;
        let err = call(&f, vec![Value::String("a".into())]).unwrap_err();
        assert_eq!(err.index, 0);
        assert_eq!(err.expected, Some(DataType::Int64));
        assert_eq!(err.got, Some(DataType::String));
    }

    #[test]
    fn test_untyped_argument() {
        let f = |v: Value| v.as_f64().unwrap_or(0.0);
        assert_eq!(types(&f), vec![None]);
        assert_eq!(call(&f, vec![Value::Int32(3)]), Ok(3.0));
    }

    #[test]
    fn test_slot_fn() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let seen = std::sync::Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        let f = move |slot: usize, x: i32| {
            s.fetch_add(slot * 100 + x as usize, Ordering::SeqCst);
        };
        <_ as SlotFn<(i32,)>>::call_values(&f, 2, vec![Value::Int32(5)]).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 205);
    }

    #[test]
    fn test_accumulate_fn() {
        let f = |acc: &mut Vec<i64>, x: i64| acc.push(x * 2);
        let mut acc = Vec::new();
        <_ as AccumulateFn<Vec<i64>, (i64,)>>::call_values(&f, &mut acc, vec![Value::Int64(4)]).unwrap();
        assert_eq!(acc, vec![8]);
    }
}
