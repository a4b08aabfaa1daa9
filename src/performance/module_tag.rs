//! Coarse caller classification used as the leading index of most complex
//! statistics families.

/// Classification of a producing thread, mirroring the thread manager's
/// notion of a thread's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    System,
    Worker,
    Vacuum,
}

impl Module {
    pub const ALL: [Module; 3] = [Module::System, Module::Worker, Module::Vacuum];
    pub const COUNT: u32 = 3;

    pub fn as_str(self) -> &'static str {
        match self {
            Module::System => "system",
            Module::Worker => "worker",
            Module::Vacuum => "vacuum",
        }
    }
}

/// Stands in for the engine's thread handle. Producers and controllers
/// receive one of these instead of reaching into the real thread manager.
#[derive(Debug, Clone, Copy)]
pub struct ThreadContext {
    pub tran_index: usize,
    pub module: Module,
}

impl ThreadContext {
    pub fn new(tran_index: usize, module: Module) -> Self {
        ThreadContext { tran_index, module }
    }

    /// Off-thread callers with no role are classified as `System`, per the
    /// module tagging contract.
    pub fn system() -> Self {
        ThreadContext { tran_index: 0, module: Module::System }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_role_classifies_as_system() {
        let ctx = ThreadContext::system();
        assert_eq!(ctx.module, Module::System);
    }

    #[test]
    fn module_names_are_stable() {
        assert_eq!(Module::System.as_str(), "system");
        assert_eq!(Module::Worker.as_str(), "worker");
        assert_eq!(Module::Vacuum.as_str(), "vacuum");
    }
}
