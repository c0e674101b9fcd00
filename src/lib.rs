/*!
```console
        _   _
   __ _| |_| |_ _ __  _   _ _ __ ___
  / _` | __| __| '_ \| | | | '_ ` _ \
 | (_| | |_| |_| | | | |_| | | | | | |
  \__,_|\__|\__|_| |_|\__,_|_| |_| |_|
```

Strided N-dimensional tensors with einsum, masking and the attention
mechanisms built from them (full scaled dot-product and ProbSparse).
*/

pub mod attention;
mod core;

pub use crate::core::{einsum, Dropout, Equation, Tensor};
