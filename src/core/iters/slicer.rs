/// Walks the slices of a tensor obtained by fixing `fixed` dimensions.
/// Each item holds `Some(i)` for a fixed dimension and `None` for a free one.
pub(crate) struct Slicer<'a> {
    sizes: &'a [usize],
    indices: Vec<Option<usize>>,
    current: usize,
    maximum: usize,
}

impl<'a> Slicer<'a> {
    pub(crate) fn new(sizes: &'a [usize], fixed: &[usize]) -> Self {
        let mut maximum = 1;
        let indices = (0..sizes.len())
            .map(|d| {
                fixed.contains(&d).then(|| {
                    maximum *= sizes[d];
                    0
                })
            })
            .collect();

        Slicer {
            sizes,
            indices,
            current: 0,
            maximum,
        }
    }
}

impl<'a> Iterator for Slicer<'a> {
    type Item = Vec<Option<usize>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == self.maximum {
            return None;
        }

        let next = self.indices.clone();

        for (d, slice_index) in self.indices.iter_mut().enumerate().rev() {
            if let Some(slice_index) = slice_index.as_mut() {
                *slice_index += 1;

                if *slice_index >= self.sizes[d] {
                    *slice_index = 0;
                } else {
                    break;
                }
            }
        }

        self.current += 1;
        Some(next)
    }
}
