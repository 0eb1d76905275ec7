#[cfg(test)]
mod tests {
    use crate::virtual_machine::isa::{Opcode, OperandKind};
    use std::collections::HashSet;

    macro_rules! collect_isa {
        (
            $( $(#[$doc:meta])* $name:ident, $mnemonic:literal => $kind:ident ),* $(,)?
        ) => {
            vec![ $( (Opcode::$name, $mnemonic, OperandKind::$kind) ),* ]
        };
    }

    fn isa_table() -> Vec<(Opcode, &'static str, OperandKind)> {
        crate::for_each_opcode!(collect_isa)
    }

    #[test]
    fn mnemonics_are_unique_lowercase_words() {
        let table = isa_table();
        let names: HashSet<_> = table.iter().map(|(_, m, _)| *m).collect();
        assert_eq!(names.len(), table.len());
        for (_, mnemonic, _) in &table {
            assert!(mnemonic.chars().all(|c| c.is_ascii_lowercase()), "{mnemonic}");
        }
    }

    #[test]
    fn mnemonics_do_not_collide_with_directives_or_labels() {
        for (_, mnemonic, _) in isa_table() {
            assert_ne!(mnemonic, "global");
            assert!(!mnemonic.ends_with(':'));
        }
    }

    #[test]
    fn table_matches_generated_opcodes() {
        let table = isa_table();
        assert_eq!(table.len(), Opcode::ALL.len());
        for (opcode, mnemonic, kind) in table {
            assert_eq!(Opcode::from_mnemonic(mnemonic), Some(opcode));
            assert_eq!(opcode.mnemonic(), mnemonic);
            assert_eq!(opcode.operand(), kind);
        }
    }
}
