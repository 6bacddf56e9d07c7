use crate::operation::ElementalOperation;
use termflow_term::{BlockSize, Idempotent, Term};

/// Splices `values` into the input before position `index`.
///
/// An index past the end of a finite input appends. On a cyclical input the
/// splice lands in the header when the index falls inside it; otherwise the
/// header is unrolled up to the index and the cycle rotated to resume where
/// it left off.
pub struct Insert<V> {
    name: String,
    index: usize,
    values: Vec<V>,
}

impl<V> Insert<V> {
    pub fn new(name: impl Into<String>, index: usize, values: Vec<V>) -> Self {
        Self {
            name: name.into(),
            index,
            values,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Element `k` of the spliced sequence, given element lookup on the
    /// input and the effective insertion point `at`.
    fn spliced<'a>(&'a self, input: impl Fn(usize) -> &'a V, at: usize, k: usize) -> &'a V {
        let inserted = self.values.len();
        if k < at {
            input(k)
        } else if k < at + inserted {
            &self.values[k - at]
        } else {
            input(k - inserted)
        }
    }
}

impl<V> ElementalOperation for Insert<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Input = V;
    type Output = V;

    fn name(&self) -> &str {
        &self.name
    }

    fn transform(&self, input: &Idempotent<V>, limit: BlockSize) -> Term<V> {
        match input.as_term() {
            Term::Cyclical(cyclical) => {
                let at = self.index;
                if let Some(n) = limit.limit() {
                    let prefix = (0..n)
                        .map(|k| self.spliced(|i| cyclical.get(i), at, k).clone())
                        .collect();
                    return Term::from_elements(prefix);
                }
                let mut header: Vec<V> = (0..at).map(|i| cyclical.get(i).clone()).collect();
                header.extend(self.values.iter().cloned());
                let cycle = if at <= cyclical.header().len() {
                    header.extend(cyclical.header()[at..].iter().cloned());
                    cyclical.cycle().to_vec()
                } else {
                    (0..cyclical.cycle().len())
                        .map(|k| cyclical.get(at + k).clone())
                        .collect()
                };
                Term::cyclical(header, cycle).unwrap_or_else(Term::error)
            }
            finite => {
                let elements: &[V] = match finite {
                    Term::Single(value) => std::slice::from_ref(value),
                    Term::Many(many) => many.as_slice(),
                    _ => &[],
                };
                let at = self.index.min(elements.len());
                let total = elements.len() + self.values.len();
                let n = limit.limit().map_or(total, |n| n.min(total));
                let spliced = (0..n)
                    .map(|k| self.spliced(|i| &elements[i], at, k).clone())
                    .collect();
                Term::from_elements(spliced)
            }
        }
    }

    /// At most `n` input elements can appear among the first `n` outputs.
    fn input_demand(&self, output: BlockSize) -> BlockSize {
        output
    }
}
