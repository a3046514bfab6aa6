use std::fmt::Write as _;

use crate::problem::Problem;
use crate::solution::SolveResult;
use crate::{SolveError, Solver};

/// Specialized branch-and-bound for the 0/1 knapsack problem.
///
/// The problem must have exactly one constraint row, read as
/// `sum(weight_j * x_j) <= capacity`; objective coefficients are the item
/// values. Items are considered in descending value/weight ratio, and each
/// node's subtree is bounded by a greedy fractional relaxation.
pub struct Knapsack;

impl Knapsack {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Knapsack {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
struct Item {
    /// Position of the item in the original variable order.
    index: usize,
    weight: f64,
    value: f64,
}

impl Item {
    fn ratio(&self) -> f64 {
        self.value / self.weight
    }
}

/// Search frontier entry: `level` items already decided, plus the value,
/// weight, and chosen-item set accumulated so far.
struct Node {
    level: usize,
    value: f64,
    weight: f64,
    bound: f64,
    taken: Vec<usize>,
}

impl Solver for Knapsack {
    fn solve(&self, problem: &Problem) -> Result<SolveResult, SolveError> {
        if problem.num_constraints() != 1 {
            return Err(SolveError::KnapsackShape(problem.num_constraints()));
        }

        let n = problem.num_variables();
        let capacity = problem.constraints[0].rhs;
        let mut result = SolveResult::new(n);
        let _ = writeln!(result.log, "=== Branch & Bound Knapsack Solver ===");

        let mut items: Vec<Item> = (0..n)
            .map(|j| Item {
                index: j,
                weight: problem.constraints[0].coefficients[j],
                value: problem.objective[j],
            })
            .collect();
        items.sort_by(|a, b| {
            b.ratio()
                .partial_cmp(&a.ratio())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut best_value = 0.0;
        let mut best_items: Vec<usize> = Vec::new();

        let mut stack = vec![Node {
            level: 0,
            value: 0.0,
            weight: 0.0,
            bound: fractional_bound(0, 0.0, 0.0, &items, capacity),
            taken: Vec::new(),
        }];

        let mut explored = 0;
        while let Some(node) = stack.pop() {
            explored += 1;
            let _ = writeln!(
                result.log,
                "-- Node {explored} at level {}, Value={}, Weight={}, Bound={}",
                node.level, node.value, node.weight, node.bound
            );

            if node.bound <= best_value || node.level == items.len() {
                continue;
            }
            let item = items[node.level];
            let next = node.level + 1;

            // Branch: include the item (only when it still fits).
            let with_weight = node.weight + item.weight;
            if with_weight <= capacity {
                let with_value = node.value + item.value;
                let mut taken = node.taken.clone();
                taken.push(item.index);
                if with_value > best_value {
                    best_value = with_value;
                    best_items = taken.clone();
                }
                let bound = fractional_bound(next, with_value, with_weight, &items, capacity);
                if bound > best_value {
                    stack.push(Node {
                        level: next,
                        value: with_value,
                        weight: with_weight,
                        bound,
                        taken,
                    });
                }
            }

            // Branch: exclude the item.
            let bound = fractional_bound(next, node.value, node.weight, &items, capacity);
            if bound > best_value {
                stack.push(Node {
                    level: next,
                    value: node.value,
                    weight: node.weight,
                    bound,
                    taken: node.taken,
                });
            }
        }

        let _ = writeln!(result.log, "\n*** Best Solution Found ***");
        let _ = writeln!(result.log, "Objective = {best_value}");
        let picked: Vec<String> = best_items.iter().map(|j| format!("x{}", j + 1)).collect();
        let _ = writeln!(result.log, "Items taken: {}", picked.join(", "));
        let _ = writeln!(result.log, "Nodes explored: {explored}");

        for &j in &best_items {
            result.solution[j] = 1.0;
        }
        result.objective = best_value;
        result.is_optimal = true;
        result.verify_feasibility(problem, 1e-9);
        Ok(result)
    }
}

/// Greedy fractional relaxation bound: fill the remaining capacity in ratio
/// order, taking a fractional slice of the first item that does not fit.
fn fractional_bound(
    level: usize,
    value: f64,
    weight: f64,
    items: &[Item],
    capacity: f64,
) -> f64 {
    if weight >= capacity {
        return 0.0;
    }
    let mut bound = value;
    let mut total_weight = weight;
    for item in &items[level..] {
        if total_weight + item.weight <= capacity {
            total_weight += item.weight;
            bound += item.value;
        } else {
            bound += (capacity - total_weight) * item.ratio();
            break;
        }
    }
    bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Relation, Sense};

    fn knapsack_problem(values: Vec<f64>, weights: Vec<f64>, capacity: f64) -> Problem {
        Problem::new(values, Sense::Maximize)
            .with_constraint(weights, Relation::Le, capacity)
            .unwrap()
    }

    #[test]
    fn test_reference_instance() {
        // weights [2,3,4,5], values [3,4,5,6], capacity 5 -> take the first
        // two items for value 7.
        let p = knapsack_problem(vec![3.0, 4.0, 5.0, 6.0], vec![2.0, 3.0, 4.0, 5.0], 5.0);
        let r = Knapsack::new().solve(&p).unwrap();
        assert!(r.is_optimal);
        assert!(r.is_feasible);
        assert!((r.objective - 7.0).abs() < 1e-9);
        assert_eq!(r.solution, vec![1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_nothing_fits() {
        let p = knapsack_problem(vec![10.0], vec![8.0], 5.0);
        let r = Knapsack::new().solve(&p).unwrap();
        assert_eq!(r.objective, 0.0);
        assert_eq!(r.solution, vec![0.0]);
    }

    #[test]
    fn test_everything_fits() {
        let p = knapsack_problem(vec![1.0, 2.0, 3.0], vec![1.0, 1.0, 1.0], 10.0);
        let r = Knapsack::new().solve(&p).unwrap();
        assert!((r.objective - 6.0).abs() < 1e-9);
        assert_eq!(r.solution, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_ratio_order_is_not_always_optimal() {
        // Greedy by ratio takes the 10/9 item first and gets stuck at 10;
        // the true optimum pairs the other two for 11.
        let p = knapsack_problem(vec![10.0, 5.5, 5.5], vec![9.0, 5.0, 5.0], 10.0);
        let r = Knapsack::new().solve(&p).unwrap();
        assert!((r.objective - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_shape_requirement() {
        let p = Problem::new(vec![1.0], Sense::Maximize)
            .with_constraint(vec![1.0], Relation::Le, 1.0)
            .unwrap()
            .with_constraint(vec![1.0], Relation::Le, 2.0)
            .unwrap();
        let err = Knapsack::new().solve(&p).unwrap_err();
        assert!(matches!(err, SolveError::KnapsackShape(2)));
    }
}
