use prettytable::{
    format::consts::FORMAT_BOX_CHARS,
    {Cell, Row, Table},
};
use std::{
    any::type_name,
    fmt::{Debug, Display, Formatter, Result},
};

use crate::Tensor;

impl<T> Debug for Tensor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("Tensor")
            .field("dtype", &type_name::<T>())
            .field("dims", &self.rank())
            .field("elems", &self.numel())
            .field("shape", &self.sizes())
            .finish()
    }
}

impl<T: Display + Copy> Display for Tensor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let n = self.rank();

        if n == 0 {
            writeln!(f, "{}", self.idx(&[]))?;
        } else if (1..=8).contains(&n) {
            let table = if n % 2 == 1 {
                let row = odd_dimensions(self, n, self.offset());
                set_style(Table::init(vec![row]))
            } else {
                even_dimensions(self, n, self.offset())
            };

            write!(f, "{}", table)?;
        }

        writeln!(f, "{:?}", self)
    }
}

fn odd_dimensions<T>(tensor: &Tensor<T>, n: usize, offset: usize) -> Row
where
    T: Copy + Display,
{
    let dim = tensor.rank() - n;
    let size = tensor.shape.sizes[dim];
    let stride = tensor.shape.strides[dim];

    if n == 1 {
        Row::from((0..size).map(|index| {
            let element = tensor.data[offset + index * stride];
            Cell::from(&element)
        }))
    } else {
        Row::from((0..size).map(|index| even_dimensions(tensor, n - 1, offset + index * stride)))
    }
}

fn even_dimensions<T>(tensor: &Tensor<T>, n: usize, offset: usize) -> Table
where
    T: Copy + Display,
{
    let dim = tensor.rank() - n;
    let size = tensor.shape.sizes[dim];
    let stride = tensor.shape.strides[dim];

    let rows = (0..size)
        .map(|index| odd_dimensions(tensor, n - 1, offset + index * stride))
        .collect();

    set_style(Table::init(rows))
}

fn set_style(mut table: Table) -> Table {
    table.set_format(*FORMAT_BOX_CHARS);
    table
}
