//! Keyword lists, prompts and canned replies used by the chat guard.

/// Phrases that indicate a situation needing urgent medical care.
pub const EMERGENCY_KEYWORDS: &[&str] = &[
    "severe pain",
    "heavy bleeding",
    "can't breathe",
    "chest pain",
    "unconscious",
    "seizure",
    "extremely dizzy",
    "fainted",
    "severe headache",
    "vision loss",
    "severe abdominal pain",
    "sudden swelling",
    "severe vomiting",
    "can't stop bleeding",
    "suicidal",
    "want to die",
    "kill myself",
    "end my life",
];

/// Requests for dangerous self-treatment.
pub const UNSAFE_KEYWORDS: &[&str] = &[
    "perform surgery",
    "diy surgery",
    "home surgery",
    "abortion at home",
    "self-induce",
    "coat hanger",
    "terminate pregnancy myself",
    "dangerous pills",
];

pub const HEALTH_RELATED_KEYWORDS: &[&str] = &[
    // menstrual cycle
    "period", "menstruation", "menstrual", "cycle", "pms", "pmdd",
    "cramps", "cramping", "bleeding", "spotting", "flow",
    // reproductive health
    "ovulation", "fertility", "conception", "pregnancy", "contraception",
    "birth control", "iud", "pill", "condom", "reproductive",
    // symptoms
    "pain", "discharge", "infection", "yeast", "uti", "std", "sti",
    "endometriosis", "pcos", "fibroids", "cyst",
    // hormones
    "hormone", "estrogen", "progesterone", "testosterone",
    // hygiene
    "tampon", "pad", "menstrual cup", "hygiene",
    // pregnancy
    "trimester", "fetus", "baby", "labor", "delivery", "breastfeeding",
    "postpartum", "miscarriage", "abortion",
];

pub const OFF_TOPIC_KEYWORDS: &[&str] = &[
    "computer", "laptop", "software", "programming", "code", "python",
    "javascript", "app development", "website", "algorithm",
    "football", "basketball", "cricket", "soccer", "tennis",
    "movie", "tv show", "celebrity", "actor", "music", "song",
    "recipe", "cooking", "restaurant", "pizza", "burger",
    "weather", "politics", "election", "stock market", "cryptocurrency",
];

/// Phrases in a generated answer that trigger the medical disclaimer.
pub const DIAGNOSTIC_PHRASES: &[&str] = &["i diagnose", "you have", "you need to take"];

pub const MAX_MESSAGE_CHARS: usize = 1000;

pub const SYSTEM_PROMPT: &str = "You are a compassionate and knowledgeable reproductive health education assistant. \
Your role is to provide accurate, evidence-based information about reproductive health, menstrual cycles, pregnancy, and related topics.

CRITICAL RULES:
1. NEVER provide specific medical diagnoses
2. NEVER prescribe medications or treatments
3. ALWAYS recommend consulting a healthcare provider for medical concerns
4. Be supportive and non-judgmental
5. Use clear, accessible language
6. Provide only general educational information about reproductive health
7. ONLY answer questions related to reproductive health, menstrual cycles, pregnancy, fertility, and women's health
8. REFUSE to answer questions about unrelated topics like technology, sports, entertainment, food recipes, etc.

TOPICS YOU CAN DISCUSS:
- Menstrual cycle education (phases, normal variations)
- Common menstrual symptoms and general management
- Reproductive anatomy and physiology
- Pregnancy basics and prenatal care
- Fertility awareness and conception
- Contraception methods (general information)
- Common reproductive health conditions (educational overview)
- Menstrual hygiene products
- Puberty and hormonal changes
- Menopause and perimenopause

TOPICS YOU CANNOT DISCUSS:
- Technology, programming, software
- Sports, games, entertainment
- Food recipes, cooking
- Politics, current events
- General knowledge questions
- Any topic unrelated to reproductive health

RESPONSE FORMAT:
- Provide clear, factual information
- Use bullet points for clarity when appropriate
- Acknowledge limitations of general advice
- Always include a disclaimer: \"This is general educational information. For personalized medical advice, please consult a qualified healthcare provider.\"

Remember: You are an educational resource, not a replacement for medical professionals.";

/// Classifier prompt; `{message}` is replaced with the user text.
pub const TOPIC_VALIDATION_PROMPT: &str = "You are a topic classifier. Determine if the following question is related to reproductive health, menstrual cycles, pregnancy, fertility, or women's health.

Respond with ONLY one word:
- \"RELEVANT\" if the question is about reproductive health, periods, pregnancy, fertility, or women's health
- \"IRRELEVANT\" if the question is about technology, sports, entertainment, food, politics, general knowledge, or any other unrelated topic

Question: {message}

Classification:";

pub const EMERGENCY_RESPONSE: &str = "🚨 **URGENT: Your message indicates a potentially serious medical situation.**

Please seek immediate medical attention:
- Call emergency services (911 in US, 112 in EU, or your local emergency number)
- Go to the nearest emergency room
- Contact your doctor immediately

Your health and safety are the top priority. Medical professionals can provide the urgent care you need.";

pub const UNSAFE_RESPONSE: &str = "I cannot provide information on this topic as it could be harmful to your health and safety.

If you're experiencing a crisis or having thoughts of self-harm:
- **Crisis Hotline:** 988 (Suicide & Crisis Lifeline - US)
- **International:** https://findahelpline.com

For reproductive health concerns, please speak with:
- A licensed healthcare provider
- Planned Parenthood or similar clinics
- A trusted counselor or therapist

Your wellbeing matters, and there are professionals ready to help you safely.";

const SCOPE_TOPICS: &str = "I'm a specialized reproductive health education assistant. I can only answer questions related to:

• Menstrual cycles and periods
• Pregnancy and fertility
• Reproductive health and anatomy
• Hormones and women's health
• Gynecological conditions (PCOS, endometriosis, etc.)

";

/// Reply when the keyword check rejects a message.
pub fn off_topic_response() -> String {
    format!(
        "{SCOPE_TOPICS}Your question appears to be about a different topic. \
Please ask me about reproductive health, and I'll be happy to help! 😊"
    )
}

/// Reply when the classifier rejects a message.
pub fn classifier_off_topic_response() -> String {
    format!(
        "{SCOPE_TOPICS}Your question doesn't seem to be related to reproductive health. \
If you have questions about periods, pregnancy, fertility, or women's health, I'm here to help! 😊"
    )
}

pub const MEDICAL_DISCLAIMER: &str = "\n\n⚠️ Remember: This is educational information only, not a diagnosis or prescription. Always consult a healthcare provider for personalized medical advice.";
