/// A compressed list of adjacency lists, one per node.
///
/// The links of node `i` are stored in `array[offsets[i]..offsets[i + 1]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyList<T> {
    offsets: Vec<usize>,
    array: Vec<T>,
}

impl<T> Default for AdjacencyList<T> {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            array: Vec::new(),
        }
    }
}

impl<T> AdjacencyList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node with the given links.
    pub fn push(&mut self, links: impl IntoIterator<Item = T>) {
        self.array.extend(links);
        self.offsets.push(self.array.len());
    }

    pub fn num_nodes(&self) -> usize {
        self.offsets.len() - 1
    }

    /// # Panics
    ///
    /// Panics if `node` is out of bounds.
    pub fn links(&self, node: usize) -> &[T] {
        &self.array[self.offsets[node]..self.offsets[node + 1]]
    }

    pub fn num_links(&self, node: usize) -> usize {
        self.offsets[node + 1] - self.offsets[node]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn array(&self) -> &[T] {
        &self.array
    }

    pub fn iter(&self) -> impl Iterator<Item = &[T]> {
        self.offsets
            .windows(2)
            .map(move |w| &self.array[w[0]..w[1]])
    }
}

impl<T, I> FromIterator<I> for AdjacencyList<T>
where
    I: IntoIterator<Item = T>,
{
    fn from_iter<It: IntoIterator<Item = I>>(iter: It) -> Self {
        let mut list = Self::new();
        for links in iter {
            list.push(links);
        }
        list
    }
}
