//! Data-identifier registry.
//!
//! Each 2-char DI names a field and fixes its length rule: a known fixed
//! width, or variable (terminated by GS in the message zone). The table
//! covers the identity, address, invoice, banking, tax, pay-slip and
//! identity-document namespaces used by French issuers; unknown DIs are
//! accepted as variable-length so new registry revisions degrade softly.

/// Length rule for a DI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiLength {
    /// Exactly this many characters
    Fixed(usize),
    /// Terminated by GS / RS / US
    Variable,
}

/// One registry row.
#[derive(Debug, Clone, Copy)]
pub struct DiSpec {
    /// Two-char data identifier
    pub di: &'static str,
    /// Human name of the field
    pub name: &'static str,
    /// Length rule
    pub length: DiLength,
}

use DiLength::{Fixed, Variable};

/// The registry table.
pub const REGISTRY: &[DiSpec] = &[
    // document identity
    DiSpec { di: "01", name: "Identifiant unique du document", length: Variable },
    DiSpec { di: "02", name: "Catégorie de document", length: Variable },
    DiSpec { di: "03", name: "Sous-catégorie de document", length: Variable },
    DiSpec { di: "04", name: "Application de composition", length: Variable },
    DiSpec { di: "05", name: "Version de l'application", length: Variable },
    DiSpec { di: "06", name: "Date de l'association document/2D-Doc", length: Fixed(4) },
    DiSpec { di: "07", name: "Heure de l'association document/2D-Doc", length: Fixed(6) },
    DiSpec { di: "08", name: "Date d'expiration du document", length: Fixed(4) },
    DiSpec { di: "09", name: "Nombre de pages du document", length: Fixed(4) },
    DiSpec { di: "0A", name: "Éditeur du 2D-Doc", length: Fixed(9) },
    DiSpec { di: "0B", name: "Intégrateur du 2D-Doc", length: Fixed(9) },
    // beneficiary / addressee
    DiSpec { di: "10", name: "Ligne 1 de la norme adresse postale du bénéficiaire", length: Variable },
    DiSpec { di: "11", name: "Qualité et/ou titre du bénéficiaire", length: Variable },
    DiSpec { di: "12", name: "Prénom du bénéficiaire", length: Variable },
    DiSpec { di: "13", name: "Nom du bénéficiaire", length: Variable },
    DiSpec { di: "14", name: "Ligne 1 de la norme adresse postale du destinataire", length: Variable },
    DiSpec { di: "15", name: "Qualité et/ou titre du destinataire", length: Variable },
    DiSpec { di: "16", name: "Prénom du destinataire", length: Variable },
    DiSpec { di: "17", name: "Nom du destinataire", length: Variable },
    DiSpec { di: "18", name: "Numéro et nom de voie du bénéficiaire", length: Variable },
    DiSpec { di: "19", name: "Numéro et nom de voie du destinataire", length: Variable },
    DiSpec { di: "20", name: "Code postal ou code cedex du bénéficiaire", length: Fixed(5) },
    DiSpec { di: "21", name: "Localité de destination du bénéficiaire", length: Variable },
    DiSpec { di: "22", name: "Pays du bénéficiaire", length: Fixed(2) },
    DiSpec { di: "23", name: "Ligne 2 d'adresse du bénéficiaire", length: Variable },
    DiSpec { di: "24", name: "Code postal ou code cedex du destinataire", length: Fixed(5) },
    DiSpec { di: "25", name: "Localité de destination du destinataire", length: Variable },
    DiSpec { di: "26", name: "Pays du destinataire", length: Fixed(2) },
    DiSpec { di: "27", name: "Ligne 2 d'adresse du destinataire", length: Variable },
    // banking
    DiSpec { di: "30", name: "Qualité, nom et prénom du payeur", length: Variable },
    DiSpec { di: "31", name: "Qualité, nom et prénom du bénéficiaire du paiement", length: Variable },
    DiSpec { di: "33", name: "BIC du bénéficiaire du paiement", length: Variable },
    DiSpec { di: "34", name: "IBAN du bénéficiaire du paiement", length: Variable },
    DiSpec { di: "35", name: "BIC du payeur", length: Variable },
    DiSpec { di: "36", name: "IBAN du payeur", length: Variable },
    // tax notice
    DiSpec { di: "40", name: "Numéro fiscal du bénéficiaire", length: Variable },
    DiSpec { di: "41", name: "Revenu fiscal de référence", length: Variable },
    DiSpec { di: "42", name: "Situation du foyer", length: Variable },
    DiSpec { di: "43", name: "Nombre de parts du foyer", length: Variable },
    DiSpec { di: "44", name: "Référence de l'avis d'impôt", length: Variable },
    DiSpec { di: "45", name: "Année des revenus", length: Fixed(4) },
    DiSpec { di: "46", name: "Date limite de paiement", length: Fixed(4) },
    DiSpec { di: "47", name: "Numéro fiscal du déclarant 1", length: Variable },
    DiSpec { di: "49", name: "Numéro fiscal du déclarant 2", length: Variable },
    DiSpec { di: "4V", name: "Montant de l'impôt sur le revenu", length: Variable },
    DiSpec { di: "4X", name: "Montant prélevé ou déjà payé", length: Variable },
    // invoice
    DiSpec { di: "50", name: "Numéro de facture", length: Variable },
    DiSpec { di: "51", name: "Numéro de client", length: Variable },
    DiSpec { di: "52", name: "Numéro du contrat", length: Variable },
    DiSpec { di: "53", name: "Identifiant du souscripteur du contrat", length: Variable },
    DiSpec { di: "54", name: "Date d'effet du contrat", length: Fixed(8) },
    DiSpec { di: "55", name: "Montant TTC de la facture", length: Variable },
    DiSpec { di: "56", name: "Numéro de téléphone du bénéficiaire", length: Variable },
    DiSpec { di: "57", name: "Numéro de téléphone du destinataire", length: Variable },
    DiSpec { di: "58", name: "Présence d'un co-bénéficiaire", length: Fixed(1) },
    DiSpec { di: "59", name: "Présence d'un co-destinataire", length: Fixed(1) },
    // identity / pay slip
    DiSpec { di: "60", name: "Liste des prénoms", length: Variable },
    DiSpec { di: "61", name: "Prénom", length: Variable },
    DiSpec { di: "62", name: "Nom patronymique", length: Variable },
    DiSpec { di: "63", name: "Nom d'usage", length: Variable },
    DiSpec { di: "64", name: "Nom d'épouse/époux", length: Variable },
    DiSpec { di: "65", name: "Type de pièce d'identité", length: Fixed(2) },
    DiSpec { di: "66", name: "Numéro de la pièce d'identité", length: Variable },
    DiSpec { di: "67", name: "Nationalité", length: Fixed(2) },
    DiSpec { di: "68", name: "Genre", length: Fixed(1) },
    DiSpec { di: "69", name: "Date de naissance", length: Fixed(8) },
    DiSpec { di: "6A", name: "Lieu de naissance", length: Variable },
    DiSpec { di: "6B", name: "Département du bureau émetteur", length: Fixed(3) },
    DiSpec { di: "6C", name: "Pays de naissance", length: Fixed(2) },
    // driver license
    DiSpec { di: "70", name: "Liste des catégories de permis", length: Variable },
    DiSpec { di: "71", name: "Numéro du permis de conduire", length: Variable },
    DiSpec { di: "72", name: "Date de délivrance du permis", length: Fixed(8) },
    // pay slip amounts
    DiSpec { di: "80", name: "Salaire net imposable", length: Variable },
    DiSpec { di: "81", name: "Cumul du salaire net imposable", length: Variable },
    DiSpec { di: "82", name: "Salaire brut du mois", length: Variable },
    DiSpec { di: "83", name: "Cumul du salaire brut", length: Variable },
    DiSpec { di: "84", name: "Salaire net payé", length: Variable },
    DiSpec { di: "85", name: "Période de la fiche de paie", length: Fixed(8) },
    // misc tax
    DiSpec { di: "1D", name: "Référence fiscale du local", length: Variable },
];

/// Look a DI up in the registry.
pub fn lookup(di: &str) -> Option<&'static DiSpec> {
    REGISTRY.iter().find(|spec| spec.di == di)
}

/// Field name for a DI: registry name, or the unknown-DI form.
pub fn name_for(di: &str) -> String {
    match lookup(di) {
        Some(spec) => spec.name.to_string(),
        None => format!("Unknown ({})", di),
    }
}

/// Length rule for a DI; unknown DIs read as variable.
pub fn length_for(di: &str) -> DiLength {
    lookup(di).map(|spec| spec.length).unwrap_or(Variable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown() {
        assert_eq!(lookup("41").unwrap().name, "Revenu fiscal de référence");
        assert_eq!(length_for("20"), Fixed(5));
        assert_eq!(length_for("ZZ"), Variable);
        assert_eq!(name_for("ZZ"), "Unknown (ZZ)");
    }
}
