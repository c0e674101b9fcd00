use crate::{
    core::{errors::EinsumError, iters::Indexer},
    Tensor,
};
use anyhow::{bail, Result};
use std::{collections::BTreeMap, iter::Sum, ops::Mul};
use tracing::trace;

/// A parsed einsum equation such as `blhe,bshe->bhls`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub inputs: Vec<Vec<char>>,
    pub output: Vec<char>,
}

impl Equation {
    /// Parses `inputs[->output]`. Without `->`, the output is every label used exactly once,
    /// in alphabetical order.
    pub fn parse(equation: &str) -> Result<Equation> {
        let compact: String = equation.chars().filter(|c| !c.is_whitespace()).collect();
        let syntax = || EinsumError::Syntax(equation.to_string());

        let (lhs, rhs) = match compact.split_once("->") {
            Some((lhs, rhs)) => (lhs, Some(rhs)),
            None => (compact.as_str(), None),
        };

        let valid_lhs = lhs.chars().all(|c| c.is_ascii_alphabetic() || c == ',');
        let valid_rhs = rhs.map_or(true, |rhs| rhs.chars().all(|c| c.is_ascii_alphabetic()));
        if !valid_lhs || !valid_rhs {
            bail!(syntax());
        }

        let inputs: Vec<Vec<char>> = lhs.split(',').map(|term| term.chars().collect()).collect();

        let output = match rhs {
            Some(rhs) => {
                let output: Vec<char> = rhs.chars().collect();
                for (position, &label) in output.iter().enumerate() {
                    if output[..position].contains(&label) {
                        bail!(EinsumError::RepeatedOutput(label));
                    }
                    if !inputs.iter().flatten().any(|&c| c == label) {
                        bail!(EinsumError::UnknownOutput(label));
                    }
                }
                output
            }
            None => {
                let mut counts: BTreeMap<char, usize> = BTreeMap::new();
                for &label in inputs.iter().flatten() {
                    *counts.entry(label).or_default() += 1;
                }
                counts
                    .into_iter()
                    .filter_map(|(label, count)| (count == 1).then_some(label))
                    .collect()
            }
        };

        trace!(?inputs, ?output, "parsed einsum equation");
        Ok(Equation { inputs, output })
    }

    /// Labels summed over, in order of first appearance.
    pub fn contracted(&self) -> Vec<char> {
        let mut contracted = Vec::new();
        for &label in self.inputs.iter().flatten() {
            if !self.output.contains(&label) && !contracted.contains(&label) {
                contracted.push(label);
            }
        }
        contracted
    }
}

/// Einstein summation over `operands`.
///
/// Every output element is the sum, over all assignments of the contracted labels, of the
/// product of the operand elements the assignment addresses. A label repeated within one
/// operand walks its diagonal.
pub fn einsum<T>(equation: &str, operands: &[&Tensor<T>]) -> Result<Tensor<T>>
where
    T: Copy + Mul<Output = T> + Sum<T>,
{
    let equation = Equation::parse(equation)?;

    if equation.inputs.len() != operands.len() {
        bail!(EinsumError::OperandCount {
            expected: equation.inputs.len(),
            found: operands.len(),
        });
    }

    let mut sizes: BTreeMap<char, usize> = BTreeMap::new();
    for (operand, (subscripts, tensor)) in equation.inputs.iter().zip(operands).enumerate() {
        if subscripts.len() != tensor.rank() {
            bail!(EinsumError::SubscriptRank {
                operand,
                subscripts: subscripts.iter().collect(),
                rank: tensor.rank(),
            });
        }

        for (&label, &size) in subscripts.iter().zip(tensor.sizes()) {
            match sizes.get(&label) {
                Some(&first) if first != size => bail!(EinsumError::SizeMismatch {
                    label,
                    first,
                    second: size,
                }),
                _ => {
                    sizes.insert(label, size);
                }
            }
        }
    }

    let contracted = equation.contracted();
    let labels: Vec<char> = equation.output.iter().chain(&contracted).copied().collect();
    let label_sizes = |labels: &[char]| -> Vec<usize> { labels.iter().map(|l| sizes[l]).collect() };
    let output_sizes = label_sizes(&equation.output);
    let contracted_sizes = label_sizes(&contracted);

    // Position of each operand axis inside the combined (output ++ contracted) assignment.
    let positions: Vec<Vec<usize>> = equation
        .inputs
        .iter()
        .map(|subscripts| {
            subscripts
                .iter()
                .filter_map(|label| labels.iter().position(|l| l == label))
                .collect()
        })
        .collect();

    let (first, rest) = operands.split_first().ok_or(EinsumError::OperandCount {
        expected: equation.inputs.len(),
        found: 0,
    })?;
    let data = Indexer::new(&output_sizes)
        .map(|output_index| {
            Indexer::new(&contracted_sizes)
                .map(|contracted_index| {
                    let assignment = [output_index.as_slice(), &contracted_index].concat();

                    let init = element(first, &positions[0], &assignment);

                    rest.iter()
                        .zip(&positions[1..])
                        .fold(init, |acc, (tensor, positions)| {
                            acc * element(tensor, positions, &assignment)
                        })
                })
                .sum()
        })
        .collect();

    Tensor::init(data, &output_sizes)
}

fn element<T: Copy>(tensor: &Tensor<T>, positions: &[usize], assignment: &[usize]) -> T {
    let index: Vec<usize> = positions.iter().map(|&p| assignment[p]).collect();
    tensor.idx(&index)
}
