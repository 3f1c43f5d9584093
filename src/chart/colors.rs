/// matplotlib's `tab10` qualitative palette.
pub const TAB10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Cyclic color lookup over an explicit list, or `TAB10` when none is given.
#[derive(Debug, Clone, Copy)]
pub struct Palette<'a> {
    explicit: Option<&'a [String]>,
}

impl<'a> Palette<'a> {
    pub fn new(explicit: Option<&'a [String]>) -> Self {
        Self {
            explicit: explicit.filter(|colors| !colors.is_empty()),
        }
    }

    pub fn color(&self, index: usize) -> String {
        match self.explicit {
            Some(colors) => colors[index % colors.len()].clone(),
            None => TAB10[index % TAB10.len()].to_string(),
        }
    }
}
